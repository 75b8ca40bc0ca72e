mod body;
mod drawing;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::config::InsertOptions;
use crate::docx::package::{
    ContentTypes, IMAGE_REL_TYPE, Relationship, add_content_type_defaults, next_rel_id,
    parse_rels_xml, serialize_rels,
};
use crate::docx::{CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, WPD_NS, open_archive};
use crate::error::{Error, Warning};
use crate::extract::image_dimensions;
use crate::model::PlannedInsertion;

use body::BodyEditor;
use drawing::{InlinePicture, extent_emu, image_paragraph_xml};

const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

#[derive(Debug)]
pub struct InsertReport {
    pub output_path: PathBuf,
    /// Number of image paragraphs added to the output.
    pub applied: usize,
    pub warnings: Vec<Warning>,
}

struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
}

struct StoredImage {
    rel_id: String,
    file_name: String,
    pixel_width: u32,
    pixel_height: u32,
}

/// In-memory copy of the target package. Nothing is written until
/// `into_bytes`.
struct TargetPackage {
    entries: Vec<PackageEntry>,
    body: BodyEditor,
    rels: Vec<Relationship>,
    had_rels_part: bool,
    content_types_xml: String,
    content_types: ContentTypes,
    new_defaults: Vec<(String, String)>,
    media: Vec<(String, Vec<u8>)>,
    taken_names: HashSet<String>,
    stored: HashMap<PathBuf, StoredImage>,
}

impl TargetPackage {
    fn open(path: &Path) -> Result<TargetPackage, Error> {
        let mut zip = open_archive(path)?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
            });
        }

        let text_of = |name: &str| -> Option<String> {
            entries
                .iter()
                .find(|e| e.name == name)
                .map(|e| String::from_utf8_lossy(&e.data).into_owned())
        };

        let document_xml = text_of(DOCUMENT_PART).ok_or_else(|| {
            Error::DocumentParse("missing word/document.xml (is this a DOCX file?)".into())
        })?;
        let rels_xml = text_of(DOCUMENT_RELS_PART);
        let content_types_xml = text_of(CONTENT_TYPES_PART)
            .ok_or_else(|| Error::DocumentParse("missing [Content_Types].xml".into()))?;

        let taken_names = entries.iter().map(|e| e.name.to_ascii_lowercase()).collect();

        let mut body = BodyEditor::parse(document_xml)?;
        if let Some(max_id) = entries
            .iter()
            .filter(|e| is_header_or_footer(&e.name))
            .filter_map(|e| max_drawing_id(&String::from_utf8_lossy(&e.data)))
            .max()
        {
            body.reserve_drawing_ids(max_id);
        }

        Ok(TargetPackage {
            body,
            rels: rels_xml.as_deref().map(parse_rels_xml).unwrap_or_default(),
            had_rels_part: rels_xml.is_some(),
            content_types: ContentTypes::parse(&content_types_xml),
            content_types_xml,
            new_defaults: Vec::new(),
            media: Vec::new(),
            taken_names,
            stored: HashMap::new(),
            entries,
        })
    }

    /// Add the image file as a media part with its own relationship. The
    /// same file is only stored once per batch.
    fn store_image(&mut self, image_path: &Path) -> Result<&StoredImage, String> {
        if !self.stored.contains_key(image_path) {
            let data = fs::read(image_path).map_err(|e| format!("cannot read image: {e}"))?;
            let format = image::guess_format(&data).map_err(|e| e.to_string())?;
            let (pixel_width, pixel_height) = image_dimensions(&data)?;
            if pixel_width == 0 || pixel_height == 0 {
                return Err("image has zero size".into());
            }

            let ext = format.extensions_str().first().copied().unwrap_or("bin");
            let part_name = self.free_media_name(ext);
            let file_name = part_name.rsplit('/').next().unwrap_or(part_name.as_str()).to_string();

            if !self.content_types.has_default(ext)
                && !self.new_defaults.iter().any(|(e, _)| e == ext)
            {
                self.new_defaults
                    .push((ext.to_string(), format.to_mime_type().to_string()));
            }

            let rel_id = next_rel_id(&self.rels);
            self.rels.push(Relationship {
                id: rel_id.clone(),
                rel_type: IMAGE_REL_TYPE.to_string(),
                target: format!("media/{file_name}"),
                external: false,
            });
            log::debug!("Stored {} as {} ({})", image_path.display(), part_name, rel_id);

            self.taken_names.insert(part_name.to_ascii_lowercase());
            self.media.push((part_name, data));
            self.stored.insert(
                image_path.to_path_buf(),
                StoredImage {
                    rel_id,
                    file_name,
                    pixel_width,
                    pixel_height,
                },
            );
        }
        self.stored
            .get(image_path)
            .ok_or_else(|| "image was not stored".to_string())
    }

    fn free_media_name(&self, ext: &str) -> String {
        (1..)
            .map(|n| format!("word/media/image{n}.{ext}"))
            .find(|name| !self.taken_names.contains(&name.to_ascii_lowercase()))
            .unwrap_or_else(|| format!("word/media/image.{ext}"))
    }

    fn insert(
        &mut self,
        item: &PlannedInsertion,
        placement: Placement,
        options: &InsertOptions,
    ) -> Result<usize, String> {
        if !item.image_path.is_file() {
            return Err(format!("image file not found: {}", item.image_path.display()));
        }
        let (rel_id, file_name, cx, cy) = {
            let stored = self.store_image(&item.image_path)?;
            let (cx, cy) = extent_emu(options.width_inches, stored.pixel_width, stored.pixel_height);
            (stored.rel_id.clone(), stored.file_name.clone(), cx, cy)
        };
        let drawing_id = self.body.allocate_drawing_id();
        let markup = image_paragraph_xml(
            &InlinePicture {
                rel_id: &rel_id,
                drawing_id,
                file_name: &file_name,
                cx,
                cy,
            },
            options.alignment,
        );
        match placement {
            Placement::After(anchor) => self
                .body
                .insert_after(anchor, &markup)
                .ok_or_else(|| format!("paragraph {anchor} does not exist")),
            Placement::End => Ok(self.body.append(&markup)),
        }
    }

    fn into_bytes(self) -> Result<Vec<u8>, Error> {
        let mut new_defaults = self.new_defaults;
        if !self.had_rels_part && !self.content_types.has_default("rels") {
            new_defaults.push(("rels".to_string(), RELS_CONTENT_TYPE.to_string()));
        }
        let content_types_xml = add_content_type_defaults(&self.content_types_xml, &new_defaults)?;
        let rels_xml = serialize_rels(&self.rels);
        let document_xml = self.body.into_xml();

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let replaced: Option<&[u8]> = match entry.name.as_str() {
                DOCUMENT_PART => Some(document_xml.as_bytes()),
                DOCUMENT_RELS_PART => Some(rels_xml.as_bytes()),
                CONTENT_TYPES_PART => Some(content_types_xml.as_bytes()),
                _ => None,
            };
            let method = match entry.compression {
                CompressionMethod::Stored if replaced.is_none() => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            zip.start_file(entry.name.as_str(), file_options(method))?;
            zip.write_all(replaced.unwrap_or(&entry.data))?;
        }
        if !self.had_rels_part {
            zip.start_file(DOCUMENT_RELS_PART, file_options(CompressionMethod::Deflated))?;
            zip.write_all(rels_xml.as_bytes())?;
        }
        // Already-compressed image formats gain nothing from deflate.
        for (name, data) in &self.media {
            zip.start_file(name.as_str(), file_options(CompressionMethod::Stored))?;
            zip.write_all(data)?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

#[derive(Clone, Copy, Debug)]
enum Placement {
    After(usize),
    End,
}

fn file_options(method: CompressionMethod) -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(method)
}

/// `word/header1.xml`, `word/footer2.xml`, ...
fn is_header_or_footer(name: &str) -> bool {
    name.strip_prefix("word/")
        .is_some_and(|rest| {
            !rest.contains('/')
                && (rest.starts_with("header") || rest.starts_with("footer"))
                && rest.ends_with(".xml")
        })
}

/// Highest `wp:docPr` id in a part. Headers and footers share the id space
/// with the main document.
fn max_drawing_id(xml: &str) -> Option<u32> {
    let doc = roxmltree::Document::parse(xml).ok()?;
    doc.descendants()
        .filter(|n| n.tag_name().name() == "docPr" && n.tag_name().namespace() == Some(WPD_NS))
        .filter_map(|n| n.attribute("id"))
        .filter_map(|id| id.parse::<u32>().ok())
        .max()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Apply a batch of insertions to the document at `document_path` and write
/// the result to `output_path`. The source document is never modified.
///
/// Every anchor refers to the paragraph it pointed at before the batch.
/// Anchors at or past the paragraph count append at the end of the body in
/// image order. Entries whose image is missing or unreadable are skipped and
/// reported as warnings.
pub fn insert_batch(
    document_path: &Path,
    output_path: &Path,
    plan: &[PlannedInsertion],
    options: &InsertOptions,
) -> Result<InsertReport, Error> {
    let t0 = Instant::now();
    options.validate()?;
    if same_file(document_path, output_path) {
        return Err(Error::InvalidInput(format!(
            "output {} would overwrite the source document",
            output_path.display()
        )));
    }

    log::info!(
        "Inserting {} images into {}",
        plan.len(),
        document_path.display()
    );
    let mut package = TargetPackage::open(document_path)?;
    let original_paragraphs = package.body.paragraph_count();

    // Anchors are classified against the paragraph count before the batch.
    // Past-the-end anchors all go to the end of the body in image order;
    // the rest are applied from the highest anchor down so every anchor
    // still names the paragraph it pointed at. Equal anchors: the lower
    // image index must end up closest to the anchor, so it goes in last.
    let (mut appended, mut anchored): (Vec<&PlannedInsertion>, Vec<&PlannedInsertion>) = plan
        .iter()
        .partition(|item| item.insert_after_paragraph >= original_paragraphs);
    appended.sort_by_key(|item| item.image_index);
    anchored.sort_by(|a, b| {
        b.insert_after_paragraph
            .cmp(&a.insert_after_paragraph)
            .then(b.image_index.cmp(&a.image_index))
    });

    let ordered = appended
        .into_iter()
        .map(|item| (item, Placement::End))
        .chain(
            anchored
                .into_iter()
                .map(|item| (item, Placement::After(item.insert_after_paragraph))),
        );

    let mut applied = 0;
    let mut warnings = Vec::new();
    for (item, placement) in ordered {
        match package.insert(item, placement, options) {
            Ok(new_index) => {
                applied += 1;
                match placement {
                    Placement::End => log::debug!(
                        "Image {} appended at end (anchor {} >= {} paragraphs)",
                        item.image_index,
                        item.insert_after_paragraph,
                        original_paragraphs
                    ),
                    Placement::After(anchor) => log::debug!(
                        "Image {} inserted after paragraph {} (now paragraph {})",
                        item.image_index,
                        anchor,
                        new_index
                    ),
                }
            }
            Err(detail) => {
                let warning = Warning::InvalidDecision {
                    image_index: item.image_index,
                    insert_after_paragraph: item.insert_after_paragraph,
                    detail,
                };
                log::warn!("{warning}");
                warnings.push(warning);
            }
        }
    }

    let bytes = package.into_bytes()?;
    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, &bytes)?;

    log::info!(
        "Inserted {} of {} images, saved {} ({:.1}ms, {} bytes)",
        applied,
        plan.len(),
        output_path.display(),
        t0.elapsed().as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(InsertReport {
        output_path: output_path.to_path_buf(),
        applied,
        warnings,
    })
}
