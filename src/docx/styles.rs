use std::collections::HashMap;

use super::{WML_NS, read_zip_text, wml, wml_attr};

const FALLBACK_STYLE: &str = "Normal";

/// Paragraph style id → display name, from `word/styles.xml`.
#[derive(Debug, Default)]
pub(super) struct StyleNames {
    names: HashMap<String, String>,
    default_paragraph: Option<String>,
}

impl StyleNames {
    /// Name of the style a paragraph references, or of the default paragraph
    /// style when the reference is absent or dangling.
    pub(super) fn paragraph_style_name(&self, style_id: Option<&str>) -> String {
        style_id
            .and_then(|id| self.names.get(id))
            .or(self.default_paragraph.as_ref())
            .cloned()
            .unwrap_or_else(|| FALLBACK_STYLE.to_string())
    }
}

/// Word stores a handful of built-in names in lowercase (`heading 1`) and
/// shows them capitalised in its UI. Report the UI form.
fn ui_style_name(name: &str) -> String {
    match name {
        "caption" | "header" | "footer" | "title" => {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        }
        _ => match name.strip_prefix("heading ") {
            Some(level) if level.len() == 1 && level.chars().all(|c| c.is_ascii_digit()) => {
                format!("Heading {level}")
            }
            _ => name.to_string(),
        },
    }
}

fn parse_style_names_xml(xml_content: &str) -> StyleNames {
    let mut styles = StyleNames::default();
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        return styles;
    };

    for style_node in xml.root_element().children() {
        if style_node.tag_name().name() != "style"
            || style_node.tag_name().namespace() != Some(WML_NS)
        {
            continue;
        }
        if style_node.attribute((WML_NS, "type")) != Some("paragraph") {
            continue;
        }
        let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
            continue;
        };
        let name = wml_attr(style_node, "name")
            .map(ui_style_name)
            .unwrap_or_else(|| style_id.to_string());

        let is_default = style_node
            .attribute((WML_NS, "default"))
            .is_some_and(|v| v == "1" || v == "true");
        if is_default && styles.default_paragraph.is_none() {
            styles.default_paragraph = Some(name.clone());
        }
        styles.names.insert(style_id.to_string(), name);
    }

    styles
}

pub(super) fn parse_style_names<R: std::io::Read + std::io::Seek>(
    zip: &mut zip::ZipArchive<R>,
) -> StyleNames {
    match read_zip_text(zip, "word/styles.xml") {
        Some(xml_content) => parse_style_names_xml(&xml_content),
        None => {
            log::debug!("No word/styles.xml, paragraphs fall back to {FALLBACK_STYLE}");
            StyleNames::default()
        }
    }
}

/// Style id referenced by a paragraph's `w:pPr/w:pStyle`.
pub(super) fn paragraph_style_id<'a>(para_node: roxmltree::Node<'a, 'a>) -> Option<&'a str> {
    wml(para_node, "pPr").and_then(|ppr| wml_attr(ppr, "pStyle"))
}
