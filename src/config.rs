use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::model::Alignment;

pub const DEFAULT_WIDTH_INCHES: f32 = 6.0;
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_TEMP_DIR: &str = "temp";

/// How inserted pictures are laid out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsertOptions {
    pub width_inches: f32,
    pub alignment: Alignment,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            width_inches: DEFAULT_WIDTH_INCHES,
            alignment: Alignment::Center,
        }
    }
}

impl InsertOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if !self.width_inches.is_finite() || self.width_inches <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "image width must be a positive number of inches, got {}",
                self.width_inches
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Document the images are taken from.
    pub source: PathBuf,
    /// Document the images are inserted into. Never modified.
    pub target: PathBuf,
    pub output_dir: PathBuf,
    /// Where extracted images are written.
    pub temp_dir: PathBuf,
    pub insert: InsertOptions,
}

impl PipelineConfig {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            insert: InsertOptions::default(),
        }
    }

    /// Every problem with the configuration, not just the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.source.exists() {
            errors.push(format!("source document not found: {}", self.source.display()));
        }
        if !self.target.exists() {
            errors.push(format!("target document not found: {}", self.target.display()));
        }
        if let Err(e) = self.insert.validate() {
            errors.push(e.to_string());
        }
        errors
    }

    /// Create the output and temp directories. Existing directories are fine.
    pub fn prepare_dirs(&self) -> Result<(), Error> {
        fs::create_dir_all(&self.output_dir)?;
        fs::create_dir_all(&self.temp_dir)?;
        Ok(())
    }

    /// `<output_dir>/<target stem>_result.<target extension>`
    pub fn output_path(&self) -> PathBuf {
        result_path(&self.output_dir, &self.target)
    }
}

fn result_path(output_dir: &Path, target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let ext = target
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "docx".to_string());
    output_dir.join(format!("{stem}_result.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_derives_from_target() {
        let mut config = PipelineConfig::new("from/a.docx", "to/bid.docx");
        config.output_dir = PathBuf::from("out");
        assert_eq!(config.output_path(), PathBuf::from("out/bid_result.docx"));
    }

    #[test]
    fn validate_collects_all_errors() {
        let mut config = PipelineConfig::new("/nonexistent/a.docx", "/nonexistent/b.docx");
        config.insert.width_inches = 0.0;
        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("source"));
        assert!(errors[1].contains("target"));
    }

    #[test]
    fn width_must_be_positive() {
        let bad = InsertOptions {
            width_inches: -1.0,
            ..InsertOptions::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidInput(_))));
        let nan = InsertOptions {
            width_inches: f32::NAN,
            ..InsertOptions::default()
        };
        assert!(nan.validate().is_err());
        assert!(InsertOptions::default().validate().is_ok());
    }
}
