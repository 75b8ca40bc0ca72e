//! Contract with whatever decides where images go.
//!
//! The engine never trusts a plan: every decision is checked against the
//! extracted image batch before anything is inserted, and a plan whose size
//! differs from the number of images is applied as given.

mod digest;
mod external;
mod heading;

use std::fs;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Warning};
use crate::model::{DocumentStructure, ImageRecord, PlannedInsertion};

pub use digest::{ParagraphDigest, PREVIEW_CHARS, StructureDigest};
pub use external::{CommandPlanner, FilePlanner};
pub use heading::HeadingPlanner;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InsertionDecision {
    pub image_index: usize,
    /// Paragraph index in the target before any insertion. Values at or past
    /// the paragraph count mean "append at the end".
    #[serde(alias = "insert_after_para")]
    pub insert_after_paragraph: usize,
    #[serde(default)]
    pub reason: String,
}

/// Decisions in the order the planner returned them.
pub type InsertionPlan = Vec<InsertionDecision>;

/// Everything a planner gets to look at.
pub struct PlanRequest<'a> {
    pub structure: &'a DocumentStructure,
    pub images: &'a [ImageRecord],
}

pub struct ImagePayload {
    pub index: usize,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl<'a> PlanRequest<'a> {
    pub fn new(structure: &'a DocumentStructure, images: &'a [ImageRecord]) -> Self {
        Self { structure, images }
    }

    /// Plain-text rendering for planners that only read text.
    pub fn text_digest(&self) -> String {
        self.json_digest().render()
    }

    pub fn json_digest(&self) -> StructureDigest {
        StructureDigest::new(self.structure, self.images.len())
    }

    /// Raw image bytes for planners that can look at pictures.
    pub fn image_payloads(&self) -> Result<Vec<ImagePayload>, Error> {
        self.images
            .iter()
            .map(|img| {
                Ok(ImagePayload {
                    index: img.index,
                    content_type: img.content_type.clone(),
                    data: fs::read(&img.storage_path)?,
                })
            })
            .collect()
    }
}

pub trait InsertionPlanner {
    fn name(&self) -> &str;

    /// Produce a plan. Failures are reported as `Error::Oracle` and are not
    /// retried.
    fn plan(&self, request: &PlanRequest) -> Result<InsertionPlan, Error>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanResponse {
    List(Vec<InsertionDecision>),
    Wrapped { decisions: Vec<InsertionDecision> },
}

/// Contents of the first fenced code block, preferring one tagged `json`.
fn fenced_block(text: &str) -> Option<&str> {
    let start = match text.find("```json") {
        Some(i) => i + "```json".len(),
        None => text.find("```")? + 3,
    };
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Parse a planner's answer: a JSON array of decisions, an object with a
/// `decisions` array, or either of those inside a fenced code block.
pub fn parse_plan_response(text: &str) -> Result<InsertionPlan, Error> {
    let trimmed = text.trim();
    match serde_json::from_str::<PlanResponse>(trimmed) {
        Ok(PlanResponse::List(plan)) | Ok(PlanResponse::Wrapped { decisions: plan }) => Ok(plan),
        Err(e) => match fenced_block(trimmed) {
            Some(inner) if inner != trimmed => parse_plan_response(inner),
            _ => Err(Error::Oracle(format!("response is not an insertion plan: {e}"))),
        },
    }
}

/// Decisions that passed validation, plus what was dropped and why.
#[derive(Debug, Default)]
pub struct ValidatedPlan {
    pub insertions: Vec<PlannedInsertion>,
    pub warnings: Vec<Warning>,
}

pub fn validate_plan(plan: &[InsertionDecision], images: &[ImageRecord]) -> ValidatedPlan {
    if plan.len() != images.len() {
        log::warn!(
            "Planner suggested {} positions for {} images",
            plan.len(),
            images.len()
        );
    }

    let mut validated = ValidatedPlan::default();
    for decision in plan {
        let rejected = match images.iter().find(|img| img.index == decision.image_index) {
            None => Some(format!(
                "image index out of range ({} images extracted)",
                images.len()
            )),
            Some(img) if !img.storage_path.is_file() => Some(format!(
                "image file not found: {}",
                img.storage_path.display()
            )),
            Some(img) => {
                log::info!(
                    "  Image {} -> after paragraph {}: {}",
                    decision.image_index,
                    decision.insert_after_paragraph,
                    if decision.reason.is_empty() {
                        "no reason given"
                    } else {
                        decision.reason.as_str()
                    }
                );
                validated.insertions.push(PlannedInsertion {
                    image_index: decision.image_index,
                    image_path: img.storage_path.clone(),
                    insert_after_paragraph: decision.insert_after_paragraph,
                });
                None
            }
        };
        if let Some(detail) = rejected {
            let warning = Warning::InvalidDecision {
                image_index: decision.image_index,
                insert_after_paragraph: decision.insert_after_paragraph,
                detail,
            };
            log::warn!("{warning}");
            validated.warnings.push(warning);
        }
    }
    validated
}
