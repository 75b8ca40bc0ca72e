use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// Source or target document does not exist.
    DocumentNotFound(PathBuf),
    /// The container could not be opened or is not a word-processing package.
    DocumentParse(String),
    /// The insertion planner failed or produced output that is not a plan.
    Oracle(String),
    /// Caller supplied arguments that can never succeed.
    InvalidInput(String),
    Io(std::io::Error),
    Xml(roxmltree::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DocumentNotFound(path) => write!(f, "document not found: {}", path.display()),
            Error::DocumentParse(msg) => write!(f, "invalid DOCX: {msg}"),
            Error::Oracle(msg) => write!(f, "insertion planner failed: {msg}"),
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Xml(e) => write!(f, "XML parse error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Xml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Xml(e)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => Error::Io(io),
            other => Error::DocumentParse(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Oracle(e.to_string())
    }
}

/// Per-item problems that are recovered by skipping the item.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// An embedded resource could not be decoded for its pixel dimensions.
    ImageDecode { filename: String, detail: String },
    /// A plan entry was dropped before or during insertion.
    InvalidDecision {
        image_index: usize,
        insert_after_paragraph: usize,
        detail: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ImageDecode { filename, detail } => {
                write!(f, "cannot read dimensions of {filename}: {detail}")
            }
            Warning::InvalidDecision {
                image_index,
                insert_after_paragraph,
                detail,
            } => write!(
                f,
                "skipped image {image_index} after paragraph {insert_after_paragraph}: {detail}"
            ),
        }
    }
}
