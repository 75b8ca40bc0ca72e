use std::collections::HashSet;

use super::{InsertionDecision, InsertionPlan, InsertionPlanner, PlanRequest};
use crate::error::Error;

/// Offline planner that spreads images over the document's sections.
///
/// Image `i` goes to section `i % headings`. Inside a section the first
/// unused empty paragraph is preferred, otherwise the image follows the
/// heading itself. Without headings everything is appended at the end.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadingPlanner;

impl InsertionPlanner for HeadingPlanner {
    fn name(&self) -> &str {
        "heading"
    }

    fn plan(&self, request: &PlanRequest) -> Result<InsertionPlan, Error> {
        let structure = request.structure;
        let headings = &structure.headings;

        if headings.is_empty() {
            return Ok(request
                .images
                .iter()
                .map(|img| InsertionDecision {
                    image_index: img.index,
                    insert_after_paragraph: structure.total_paragraphs,
                    reason: "no headings, appended at end".to_string(),
                })
                .collect());
        }

        let mut used = HashSet::new();
        let plan = request
            .images
            .iter()
            .enumerate()
            .map(|(i, img)| {
                let slot = i % headings.len();
                let heading = &headings[slot];
                let section_end = headings
                    .get(slot + 1)
                    .map(|h| h.index)
                    .unwrap_or(structure.total_paragraphs);
                let empty = structure
                    .empty_paragraphs
                    .iter()
                    .copied()
                    .find(|&e| e > heading.index && e < section_end && !used.contains(&e));

                match empty {
                    Some(e) => {
                        used.insert(e);
                        InsertionDecision {
                            image_index: img.index,
                            insert_after_paragraph: e,
                            reason: format!("empty paragraph under \"{}\"", heading.text),
                        }
                    }
                    None => InsertionDecision {
                        image_index: img.index,
                        insert_after_paragraph: heading.index,
                        reason: format!("after heading \"{}\"", heading.text),
                    },
                }
            })
            .collect();
        Ok(plan)
    }
}
