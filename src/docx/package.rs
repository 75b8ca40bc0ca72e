//! Open Packaging Conventions plumbing: relationship tables and content types.

use std::collections::HashMap;

pub(crate) const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub(crate) const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Relationship {
    pub(crate) id: String,
    pub(crate) rel_type: String,
    pub(crate) target: String,
    pub(crate) external: bool,
}

impl Relationship {
    /// Internal relationship pointing at an image part. Matches on the
    /// relationship type and, for packages written by older tools with odd
    /// types, on the target path.
    pub(crate) fn is_image(&self) -> bool {
        !self.external && (self.rel_type.ends_with("/image") || self.target.contains("image"))
    }
}

/// Relationships in the order they are stored in the `.rels` part.
pub(crate) fn parse_rels_xml(xml_content: &str) -> Vec<Relationship> {
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        return Vec::new();
    };
    xml.root_element()
        .children()
        .filter(|n| n.tag_name().name() == "Relationship")
        .filter_map(|node| {
            let id = node.attribute("Id")?;
            let target = node.attribute("Target")?;
            Some(Relationship {
                id: id.to_string(),
                rel_type: node.attribute("Type").unwrap_or("").to_string(),
                target: target.to_string(),
                external: node.attribute("TargetMode") == Some("External"),
            })
        })
        .collect()
}

pub(crate) fn serialize_rels(rels: &[Relationship]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    );
    out.push_str(&format!("<Relationships xmlns=\"{PKG_REL_NS}\">"));
    for rel in rels {
        out.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"",
            escape_xml(&rel.id),
            escape_xml(&rel.rel_type),
            escape_xml(&rel.target)
        ));
        if rel.external {
            out.push_str(" TargetMode=\"External\"");
        }
        out.push_str("/>");
    }
    out.push_str("</Relationships>");
    out
}

/// Smallest `rIdN` above every numeric id already in use.
pub(crate) fn next_rel_id(rels: &[Relationship]) -> String {
    let max = rels
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// Resolve a relationship target relative to the directory of its source
/// part. `word` + `media/image1.png` is `word/media/image1.png`; absolute
/// targets are taken from the package root.
pub(crate) fn resolve_part_name(source_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let relative = match target.strip_prefix('/') {
        Some(abs) => abs,
        None => {
            segments.extend(source_dir.split('/').filter(|s| !s.is_empty()));
            target
        }
    };
    for seg in relative.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Override part names carry a leading slash and compare case-insensitively.
fn part_key(part_name: &str) -> String {
    format!("/{}", part_name.trim_start_matches('/')).to_ascii_lowercase()
}

#[derive(Debug, Default)]
pub(crate) struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    pub(crate) fn parse(xml_content: &str) -> ContentTypes {
        let mut types = ContentTypes::default();
        let Ok(xml) = roxmltree::Document::parse(xml_content) else {
            return types;
        };
        for node in xml.root_element().children() {
            match node.tag_name().name() {
                "Default" => {
                    if let (Some(ext), Some(ct)) =
                        (node.attribute("Extension"), node.attribute("ContentType"))
                    {
                        types
                            .defaults
                            .insert(ext.to_ascii_lowercase(), ct.to_string());
                    }
                }
                "Override" => {
                    if let (Some(part), Some(ct)) =
                        (node.attribute("PartName"), node.attribute("ContentType"))
                    {
                        types.overrides.insert(part_key(part), ct.to_string());
                    }
                }
                _ => {}
            }
        }
        types
    }

    pub(crate) fn content_type_for(&self, part_name: &str) -> Option<&str> {
        if let Some(ct) = self.overrides.get(&part_key(part_name)) {
            return Some(ct.as_str());
        }
        let ext = part_name.rsplit_once('.')?.1.to_ascii_lowercase();
        self.defaults.get(&ext).map(String::as_str)
    }

    pub(crate) fn has_default(&self, ext: &str) -> bool {
        self.defaults.contains_key(&ext.to_ascii_lowercase())
    }
}

/// Add `<Default>` entries to a `[Content_Types].xml` document, keeping the
/// rest of the part byte-for-byte.
pub(crate) fn add_content_type_defaults(
    xml_content: &str,
    additions: &[(String, String)],
) -> Result<String, crate::Error> {
    if additions.is_empty() {
        return Ok(xml_content.to_string());
    }
    let xml = roxmltree::Document::parse(xml_content)?;
    let root = xml.root_element();
    let range = root.range();
    let close = xml_content[range.clone()]
        .rfind("</")
        .map(|offset| range.start + offset);

    let mut entries = String::new();
    for (ext, ct) in additions {
        entries.push_str(&format!(
            "<Default Extension=\"{}\" ContentType=\"{}\"/>",
            escape_xml(ext),
            escape_xml(ct)
        ));
    }

    Ok(match close {
        Some(at) => format!("{}{}{}", &xml_content[..at], entries, &xml_content[at..]),
        None => {
            // Self-closing <Types/>: expand it.
            let head = xml_content[range.start..range.end]
                .trim_end_matches("/>")
                .trim_end();
            format!(
                "{}{}>{}</{}>{}",
                &xml_content[..range.start],
                head,
                entries,
                root_qualified_name(head),
                &xml_content[range.end..]
            )
        }
    })
}

fn root_qualified_name(open_tag: &str) -> &str {
    open_tag
        .trim_start_matches('<')
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("Types")
}

pub(crate) fn escape_xml(val: &str) -> String {
    let mut out = String::with_capacity(val.len());
    for c in val.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
