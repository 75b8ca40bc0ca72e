pub(crate) mod package;
mod structure;
mod styles;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Error;

pub use structure::analyze_structure;

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const WPD_NS: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub(crate) const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
pub(crate) const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

pub(crate) fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

pub(crate) fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

pub(crate) fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

/// Open a DOCX container. A missing file is reported as `DocumentNotFound`,
/// anything that is not a ZIP archive as `DocumentParse`.
pub(crate) fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>, Error> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::DocumentNotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => Error::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", e, path.display()),
        )),
        _ => Error::Io(e),
    })?;
    zip::ZipArchive::new(file)
        .map_err(|_| Error::DocumentParse(format!("{} is not a ZIP archive", path.display())))
}

pub(crate) fn read_zip_text<R: std::io::Read + std::io::Seek>(
    zip: &mut zip::ZipArchive<R>,
    name: &str,
) -> Option<String> {
    let mut content = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut content).ok()?;
    Some(content)
}

pub(crate) fn read_zip_bytes<R: std::io::Read + std::io::Seek>(
    zip: &mut zip::ZipArchive<R>,
    name: &str,
) -> Option<Vec<u8>> {
    let mut data = Vec::new();
    zip.by_name(name).ok()?.read_to_end(&mut data).ok()?;
    Some(data)
}

pub(crate) fn read_document_xml<R: std::io::Read + std::io::Seek>(
    zip: &mut zip::ZipArchive<R>,
) -> Result<String, Error> {
    read_zip_text(zip, DOCUMENT_PART).ok_or_else(|| {
        Error::DocumentParse("missing word/document.xml (is this a DOCX file?)".into())
    })
}

pub(crate) fn body<'a>(xml: &'a roxmltree::Document<'a>) -> Result<roxmltree::Node<'a, 'a>, Error> {
    wml(xml.root_element(), "body").ok_or_else(|| Error::DocumentParse("missing w:body".into()))
}

/// Direct `w:p` children of the body, in document order. This is the
/// indexable paragraph sequence; table cells and content controls are not
/// part of it.
pub(crate) fn body_paragraphs<'a>(
    body: roxmltree::Node<'a, 'a>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    body.children().filter(|n| is_wml(*n, "p"))
}
