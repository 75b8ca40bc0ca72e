use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

const IMAGE_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const BUILTIN_STYLES: &str = r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>
<w:style w:type="paragraph" w:styleId="Caption"><w:name w:val="caption"/></w:style>
<w:style w:type="character" w:styleId="Heading1Char"><w:name w:val="Heading 1 Char"/></w:style>"#;

/// Output directory for a test case: tests/output/<case>/, emptied first.
pub fn output_dir(case: &str) -> PathBuf {
    let dir = PathBuf::from("tests/output").join(case);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// A solid-colour PNG.
pub fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn write_png(path: &Path, width: u32, height: u32) -> PathBuf {
    fs::write(path, png_bytes(width, height, [200, 40, 40])).unwrap();
    path.to_path_buf()
}

enum Block {
    Para { style: Option<String>, text: String },
    Picture { media: String },
    Raw(String),
}

/// Builds minimal but complete DOCX packages.
pub struct DocxBuilder {
    blocks: Vec<Block>,
    media: Vec<(String, Vec<u8>)>,
    /// Extra `w:style` elements; `None` leaves out `word/styles.xml`.
    styles: Option<String>,
    parts: Vec<(String, String)>,
}

impl Default for DocxBuilder {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            media: Vec::new(),
            styles: Some(String::new()),
            parts: Vec::new(),
        }
    }
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a paragraph style. `name` is written as is, so lowercase built-in
    /// names can be tested. An empty name writes a style without `w:name`.
    pub fn style(mut self, style_id: &str, name: &str) -> Self {
        let xml = if name.is_empty() {
            format!(r#"<w:style w:type="paragraph" w:styleId="{style_id}"/>"#)
        } else {
            format!(
                r#"<w:style w:type="paragraph" w:styleId="{style_id}"><w:name w:val="{name}"/></w:style>"#
            )
        };
        if let Some(styles) = self.styles.as_mut() {
            styles.push_str(&xml);
        }
        self
    }

    pub fn without_styles(mut self) -> Self {
        self.styles = None;
        self
    }

    /// Any other package part, stored verbatim.
    pub fn part(mut self, name: &str, xml: &str) -> Self {
        self.parts.push((name.to_string(), xml.to_string()));
        self
    }

    pub fn heading(self, level: u32, text: &str) -> Self {
        self.styled(&format!("Heading{level}"), text)
    }

    pub fn para(mut self, text: &str) -> Self {
        self.blocks.push(Block::Para {
            style: None,
            text: text.to_string(),
        });
        self
    }

    pub fn empty(self) -> Self {
        self.para("")
    }

    pub fn styled(mut self, style_id: &str, text: &str) -> Self {
        self.blocks.push(Block::Para {
            style: Some(style_id.to_string()),
            text: text.to_string(),
        });
        self
    }

    /// Body-level markup inserted as is (tables, section properties).
    pub fn raw(mut self, xml: &str) -> Self {
        self.blocks.push(Block::Raw(xml.to_string()));
        self
    }

    /// Register a media part and its relationship. Relationships are written
    /// in registration order.
    pub fn image(mut self, name: &str, data: Vec<u8>) -> Self {
        self.media.push((name.to_string(), data));
        self
    }

    /// A paragraph showing a previously registered media part.
    pub fn picture(mut self, name: &str) -> Self {
        self.blocks.push(Block::Picture {
            media: name.to_string(),
        });
        self
    }

    fn rel_id(&self, media: &str) -> String {
        let pos = self
            .media
            .iter()
            .position(|(n, _)| n == media)
            .expect("picture refers to an unregistered image");
        format!("rId{}", pos + 10)
    }

    fn document_xml(&self) -> String {
        let mut body = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            match block {
                Block::Para { style, text } => {
                    body.push_str("<w:p>");
                    if let Some(style) = style {
                        body.push_str(&format!(r#"<w:pPr><w:pStyle w:val="{style}"/></w:pPr>"#));
                    }
                    if !text.is_empty() {
                        body.push_str(&format!(
                            r#"<w:r><w:t xml:space="preserve">{text}</w:t></w:r>"#
                        ));
                    }
                    body.push_str("</w:p>");
                }
                Block::Picture { media } => {
                    let rid = self.rel_id(media);
                    let id = i + 1;
                    body.push_str(&format!(
                        concat!(
                            r#"<w:p><w:r><w:drawing><wp:inline><wp:extent cx="914400" cy="914400"/>"#,
                            r#"<wp:docPr id="{id}" name="Existing {id}"/><a:graphic><a:graphicData uri="{pic}">"#,
                            r#"<pic:pic><pic:blipFill><a:blip r:embed="{rid}"/></pic:blipFill></pic:pic>"#,
                            r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
                        ),
                        id = id,
                        pic = PIC_NS,
                        rid = rid
                    ));
                }
                Block::Raw(xml) => body.push_str(xml),
            }
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}" xmlns:wp="{WP_NS}" xmlns:a="{A_NS}" xmlns:pic="{PIC_NS}"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
        )
    }

    fn rels_xml(&self) -> String {
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/image.png" TargetMode="External"/>
"#,
        );
        for (name, _) in &self.media {
            rels.push_str(&format!(
                r#"<Relationship Id="{}" Type="{IMAGE_REL}" Target="media/{name}"/>
"#,
                self.rel_id(name)
            ));
        }
        rels.push_str("</Relationships>");
        rels
    }

    pub fn write(&self, path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;
        let package_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

        let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
        let mut add = |name: &str, data: &[u8]| {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        };
        add("[Content_Types].xml", content_types.as_bytes());
        add("_rels/.rels", package_rels.as_bytes());
        add("word/document.xml", self.document_xml().as_bytes());
        add("word/_rels/document.xml.rels", self.rels_xml().as_bytes());
        if let Some(extra) = &self.styles {
            let styles = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{W_NS}">{BUILTIN_STYLES}{extra}</w:styles>"#
            );
            add("word/styles.xml", styles.as_bytes());
        }
        for (name, data) in &self.media {
            add(&format!("word/media/{name}"), data);
        }
        for (name, xml) in &self.parts {
            add(name, xml.as_bytes());
        }
        zip.finish().unwrap();
        path.to_path_buf()
    }
}

/// Ten paragraphs, headings at 0 and 5, empty paragraphs at 3 and 7.
pub fn ten_paragraph_target() -> DocxBuilder {
    DocxBuilder::new()
        .heading(1, "Project Scope")
        .para("The project covers the supply of equipment.")
        .para("Delivery is phased over two years.")
        .empty()
        .para("Site surveys precede installation.")
        .heading(1, "Technical Proposal")
        .para("Our architecture is modular.")
        .empty()
        .para("Components are field replaceable.")
        .para("Support is provided around the clock.")
}

/// Two-image source document.
pub fn two_image_source() -> DocxBuilder {
    DocxBuilder::new()
        .image("image1.png", png_bytes(400, 200, [10, 120, 200]))
        .image("image2.png", png_bytes(300, 300, [200, 120, 10]))
        .para("Figures")
        .picture("image1.png")
        .picture("image2.png")
}

pub fn read_part(docx: &Path, name: &str) -> Option<String> {
    let mut zip = zip::ZipArchive::new(fs::File::open(docx).unwrap()).unwrap();
    let mut file = zip.by_name(name).ok()?;
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    Some(out)
}

pub fn part_names(docx: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(fs::File::open(docx).unwrap()).unwrap();
    zip.file_names().map(str::to_string).collect()
}

/// What a test needs to know about one body paragraph.
#[derive(Debug, Default)]
pub struct ParaInfo {
    pub text: String,
    pub blip: Option<String>,
    pub jc: Option<String>,
    pub extent: Option<(u64, u64)>,
}

pub fn body_paragraphs(docx: &Path) -> Vec<ParaInfo> {
    let xml = read_part(docx, "word/document.xml").unwrap();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let body = doc
        .root_element()
        .children()
        .find(|n| n.tag_name().name() == "body")
        .unwrap();
    body.children()
        .filter(|n| n.tag_name().name() == "p" && n.tag_name().namespace() == Some(W_NS))
        .map(|p| {
            let find = |name: &str, ns: &str| {
                p.descendants()
                    .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(ns))
            };
            ParaInfo {
                text: p
                    .descendants()
                    .filter(|n| n.tag_name().name() == "t")
                    .filter_map(|n| n.text())
                    .collect(),
                blip: find("blip", A_NS)
                    .and_then(|b| b.attribute((R_NS, "embed")))
                    .map(str::to_string),
                jc: find("jc", W_NS)
                    .and_then(|j| j.attribute((W_NS, "val")))
                    .map(str::to_string),
                extent: find("extent", WP_NS).map(|e| {
                    (
                        e.attribute("cx").unwrap().parse().unwrap(),
                        e.attribute("cy").unwrap().parse().unwrap(),
                    )
                }),
            }
        })
        .collect()
}

/// Relationship id → target for the main document part.
pub fn document_rels(docx: &Path) -> HashMap<String, String> {
    let xml = read_part(docx, "word/_rels/document.xml.rels").unwrap();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    doc.root_element()
        .children()
        .filter(|n| n.is_element())
        .filter_map(|n| Some((n.attribute("Id")?.to_string(), n.attribute("Target")?.to_string())))
        .collect()
}

/// Every `wp:docPr` id in the main document part.
pub fn drawing_ids(docx: &Path) -> Vec<u32> {
    let xml = read_part(docx, "word/document.xml").unwrap();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    doc.descendants()
        .filter(|n| n.tag_name().name() == "docPr" && n.tag_name().namespace() == Some(WP_NS))
        .map(|n| n.attribute("id").unwrap().parse().unwrap())
        .collect()
}

/// Indices of paragraphs that carry a picture.
pub fn picture_positions(paras: &[ParaInfo]) -> Vec<usize> {
    paras
        .iter()
        .enumerate()
        .filter(|(_, p)| p.blip.is_some())
        .map(|(i, _)| i)
        .collect()
}
