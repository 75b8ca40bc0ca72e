use std::path::Path;
use std::time::Instant;

use crate::error::Error;
use crate::model::{DocumentStructure, ParagraphRecord};

use super::styles::{StyleNames, paragraph_style_id, parse_style_names};
use super::{WML_NS, body, body_paragraphs, open_archive, read_document_xml, wml};

const HEADING_PREFIX: &str = "Heading";

/// Heading styles are named `Heading` optionally followed by a level token
/// (`Heading 2`). A trailing token that is not a number leaves the level
/// unknown.
fn classify_heading(style: &str) -> (bool, Option<u32>) {
    if !style.starts_with(HEADING_PREFIX) {
        return (false, None);
    }
    let level = style
        .split_whitespace()
        .last()
        .and_then(|tok| tok.parse::<u32>().ok());
    (true, level)
}

/// Concatenated run text of a paragraph: runs directly in the paragraph, in
/// hyperlinks, and in inline content controls.
fn paragraph_text(para_node: roxmltree::Node) -> String {
    fn collect_run_nodes<'a>(
        parent: roxmltree::Node<'a, 'a>,
        out: &mut Vec<roxmltree::Node<'a, 'a>>,
    ) {
        for child in parent.children() {
            if child.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match child.tag_name().name() {
                "r" => out.push(child),
                "hyperlink" | "ins" | "smartTag" => collect_run_nodes(child, out),
                "sdt" => {
                    if let Some(content) = wml(child, "sdtContent") {
                        collect_run_nodes(content, out);
                    }
                }
                _ => {}
            }
        }
    }

    let mut run_nodes = Vec::new();
    collect_run_nodes(para_node, &mut run_nodes);

    let mut text = String::new();
    for run in run_nodes {
        for child in run.children() {
            if child.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match child.tag_name().name() {
                "t" => {
                    if let Some(t) = child.text() {
                        text.push_str(t);
                    }
                }
                "tab" => text.push('\t'),
                "br" | "cr" => text.push('\n'),
                "noBreakHyphen" => text.push('-'),
                _ => {}
            }
        }
    }
    text
}

fn analyze_xml(xml_content: &str, styles: &StyleNames) -> Result<DocumentStructure, Error> {
    let xml = roxmltree::Document::parse(xml_content)
        .map_err(|e| Error::DocumentParse(format!("word/document.xml: {e}")))?;
    let body = body(&xml)?;

    let paragraphs = body_paragraphs(body)
        .enumerate()
        .map(|(index, node)| {
            let style = styles.paragraph_style_name(paragraph_style_id(node));
            let (is_heading, heading_level) = classify_heading(&style);
            ParagraphRecord {
                index,
                text: paragraph_text(node).trim().to_string(),
                style,
                is_heading,
                heading_level,
            }
        })
        .collect();

    Ok(DocumentStructure::from_paragraphs(paragraphs))
}

/// Snapshot the body paragraphs of a DOCX file.
pub fn analyze_structure(path: &Path) -> Result<DocumentStructure, Error> {
    let t0 = Instant::now();
    log::info!("Analyzing document structure: {}", path.display());

    let mut zip = open_archive(path)?;
    let styles = parse_style_names(&mut zip);
    let xml_content = read_document_xml(&mut zip)?;
    let structure = analyze_xml(&xml_content, &styles)?;

    log::info!(
        "{} paragraphs, {} headings, {} empty ({:.1}ms)",
        structure.total_paragraphs,
        structure.headings.len(),
        structure.empty_paragraphs.len(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(structure)
}
