use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use crate::docx::package::{ContentTypes, parse_rels_xml, resolve_part_name};
use crate::docx::{
    CONTENT_TYPES_PART, DOCUMENT_RELS_PART, open_archive, read_zip_bytes, read_zip_text,
};
use crate::error::{Error, Warning};
use crate::model::ImageRecord;

/// Name of the JSON file listing the records of an extraction directory.
pub const MANIFEST_NAME: &str = "images.json";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// `image/jpeg` → `jpg`, otherwise the last token of the MIME type.
pub fn extension_for_content_type(content_type: &str) -> String {
    let subtype = content_type.rsplit('/').next().unwrap_or(content_type);
    match subtype {
        "jpeg" => "jpg".to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn image_dimensions(data: &[u8]) -> Result<(u32, u32), String> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())
}

fn guess_content_type(part_name: &str) -> String {
    Path::new(part_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(image::ImageFormat::from_extension)
        .map(|fmt| fmt.to_mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

/// Write every image part referenced by `word/document.xml` to
/// `output_dir/image_<n>.<ext>`.
///
/// Records follow the order of the document's relationship table, which is
/// not necessarily the order the images appear in the text.
pub fn extract_images(path: &Path, output_dir: &Path) -> Result<Vec<ImageRecord>, Error> {
    extract_images_with_warnings(path, output_dir).map(|(images, _)| images)
}

pub fn extract_images_with_warnings(
    path: &Path,
    output_dir: &Path,
) -> Result<(Vec<ImageRecord>, Vec<Warning>), Error> {
    let t0 = Instant::now();
    log::info!("Extracting images from {}", path.display());

    let mut zip = open_archive(path)?;
    fs::create_dir_all(output_dir)?;

    let rels = read_zip_text(&mut zip, DOCUMENT_RELS_PART)
        .map(|xml| parse_rels_xml(&xml))
        .unwrap_or_default();
    let content_types = read_zip_text(&mut zip, CONTENT_TYPES_PART)
        .map(|xml| ContentTypes::parse(&xml))
        .unwrap_or_default();

    let mut images = Vec::new();
    let mut warnings = Vec::new();

    for rel in rels.iter().filter(|r| r.is_image()) {
        let part_name = resolve_part_name("word", &rel.target);
        let Some(data) = read_zip_bytes(&mut zip, &part_name) else {
            log::warn!("Relationship {} points at missing part {}", rel.id, part_name);
            continue;
        };

        let content_type = content_types
            .content_type_for(&part_name)
            .map(String::from)
            .unwrap_or_else(|| guess_content_type(&part_name));

        let index = images.len();
        let filename = format!("image_{}.{}", index, extension_for_content_type(&content_type));
        let storage_path = output_dir.join(&filename);
        fs::write(&storage_path, &data)?;

        let (width, height) = match image_dimensions(&data) {
            Ok((w, h)) => (Some(w), Some(h)),
            Err(detail) => {
                let warning = Warning::ImageDecode {
                    filename: filename.clone(),
                    detail,
                };
                log::warn!("{warning}");
                warnings.push(warning);
                (None, None)
            }
        };

        log::debug!(
            "Extracted {} from {} ({} bytes, {})",
            filename,
            part_name,
            data.len(),
            content_type
        );

        images.push(ImageRecord {
            index,
            filename,
            content_type,
            size_bytes: data.len() as u64,
            width,
            height,
            storage_path,
        });
    }

    log::info!(
        "Extracted {} images to {} ({:.1}ms)",
        images.len(),
        output_dir.display(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );
    Ok((images, warnings))
}

/// Persist records next to the extracted files so a later step can consume
/// them without re-reading the source document.
pub fn write_manifest(output_dir: &Path, images: &[ImageRecord]) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(images)
        .map_err(|e| Error::InvalidInput(format!("cannot serialize image records: {e}")))?;
    fs::write(output_dir.join(MANIFEST_NAME), json)?;
    Ok(())
}

pub fn read_manifest(output_dir: &Path) -> Result<Vec<ImageRecord>, Error> {
    let path = output_dir.join(MANIFEST_NAME);
    let json = fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::DocumentNotFound(path.clone()),
        _ => Error::Io(e),
    })?;
    serde_json::from_str(&json)
        .map_err(|e| Error::InvalidInput(format!("{}: {e}", path.display())))
}
