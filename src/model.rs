use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParagraphRecord {
    /// Position in the body paragraph sequence at analysis time.
    pub index: usize,
    /// Trimmed paragraph text.
    pub text: String,
    pub style: String,
    pub is_heading: bool,
    pub heading_level: Option<u32>,
}

/// Snapshot of a document's body paragraphs. Indices are only valid until
/// the document is mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentStructure {
    pub total_paragraphs: usize,
    pub paragraphs: Vec<ParagraphRecord>,
    pub headings: Vec<ParagraphRecord>,
    pub empty_paragraphs: Vec<usize>,
}

impl DocumentStructure {
    pub fn from_paragraphs(paragraphs: Vec<ParagraphRecord>) -> Self {
        let headings = paragraphs
            .iter()
            .filter(|p| p.is_heading)
            .cloned()
            .collect();
        let empty_paragraphs = paragraphs
            .iter()
            .filter(|p| p.text.is_empty())
            .map(|p| p.index)
            .collect();
        Self {
            total_paragraphs: paragraphs.len(),
            paragraphs,
            headings,
            empty_paragraphs,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Position among image relationships, in relationship-table order.
    /// This is not necessarily the order images appear on the page.
    pub index: usize,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub storage_path: PathBuf,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    /// Unrecognised values fall back to `Center`.
    pub fn parse(val: &str) -> Alignment {
        match val.trim().to_ascii_lowercase().as_str() {
            "left" => Alignment::Left,
            "right" => Alignment::Right,
            _ => Alignment::Center,
        }
    }

    pub(crate) fn wml_val(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

/// One resolved entry handed to the batch insertion engine.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedInsertion {
    pub image_index: usize,
    pub image_path: PathBuf,
    pub insert_after_paragraph: usize,
}
