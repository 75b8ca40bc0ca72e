use std::fmt::Write as _;

use serde::Serialize;

use crate::model::DocumentStructure;

/// Characters of paragraph text shown per paragraph.
pub const PREVIEW_CHARS: usize = 60;

const EMPTY_MARKER: &str = "[empty]";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParagraphDigest {
    pub index: usize,
    pub style: String,
    pub is_heading: bool,
    pub preview: String,
}

/// Condensed view of a target document for a planner.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StructureDigest {
    pub total_paragraphs: usize,
    pub total_headings: usize,
    pub empty_paragraphs: Vec<usize>,
    pub image_count: usize,
    pub paragraphs: Vec<ParagraphDigest>,
}

fn preview(text: &str) -> String {
    if text.is_empty() {
        return EMPTY_MARKER.to_string();
    }
    text.chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

impl StructureDigest {
    pub fn new(structure: &DocumentStructure, image_count: usize) -> Self {
        Self {
            total_paragraphs: structure.total_paragraphs,
            total_headings: structure.headings.len(),
            empty_paragraphs: structure.empty_paragraphs.clone(),
            image_count,
            paragraphs: structure
                .paragraphs
                .iter()
                .map(|p| ParagraphDigest {
                    index: p.index,
                    style: p.style.clone(),
                    is_heading: p.is_heading,
                    preview: preview(&p.text),
                })
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Document Structure Summary:");
        let _ = writeln!(out, "Total Paragraphs: {}", self.total_paragraphs);
        let _ = writeln!(out, "Total Headings: {}", self.total_headings);
        let _ = writeln!(
            out,
            "Empty Paragraphs: {} {:?}",
            self.empty_paragraphs.len(),
            self.empty_paragraphs
        );
        let _ = writeln!(out, "Images To Place: {}", self.image_count);
        let _ = writeln!(out);
        let _ = writeln!(out, "Paragraph Details:");
        for p in &self.paragraphs {
            let marker = if p.is_heading { " [heading]" } else { "" };
            let _ = writeln!(
                out,
                "  - Para {} ({}){}: {}",
                p.index, p.style, marker, p.preview
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParagraphRecord;

    fn structure() -> DocumentStructure {
        let long = "x".repeat(100);
        let rows = [
            ("Heading 1", true, "Scope"),
            ("Normal", false, ""),
            ("Normal", false, long.as_str()),
        ];
        DocumentStructure::from_paragraphs(
            rows.iter()
                .enumerate()
                .map(|(index, (style, heading, text))| ParagraphRecord {
                    index,
                    text: text.to_string(),
                    style: style.to_string(),
                    is_heading: *heading,
                    heading_level: heading.then_some(1),
                })
                .collect(),
        )
    }

    #[test]
    fn digest_counts_and_previews() {
        let digest = StructureDigest::new(&structure(), 2);
        assert_eq!(digest.total_paragraphs, 3);
        assert_eq!(digest.total_headings, 1);
        assert_eq!(digest.empty_paragraphs, vec![1]);
        assert_eq!(digest.paragraphs[1].preview, "[empty]");
        assert_eq!(digest.paragraphs[2].preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn rendered_text_lists_every_paragraph() {
        let text = StructureDigest::new(&structure(), 2).render();
        assert!(text.contains("Total Paragraphs: 3"));
        assert!(text.contains("Empty Paragraphs: 1 [1]"));
        assert!(text.contains("Images To Place: 2"));
        assert!(text.contains("  - Para 0 (Heading 1) [heading]: Scope"));
        assert!(text.contains("  - Para 1 (Normal): [empty]"));
    }

    #[test]
    fn json_digest_serializes() {
        let value = serde_json::to_value(StructureDigest::new(&structure(), 0)).unwrap();
        assert_eq!(value["paragraphs"][0]["is_heading"], true);
        assert_eq!(value["empty_paragraphs"][0], 1);
    }
}
