use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("{tool} not found. Install poppler-utils / tesseract-ocr and make sure it is on PATH")]
    ToolNotFound { tool: String },

    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("PDF structure error: {0}")]
    Pdf(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FolioError {
    pub(crate) fn parse(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        FolioError::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for FolioError {
    fn from(e: zip::result::ZipError) -> Self {
        FolioError::Archive(e.to_string())
    }
}

impl From<quick_xml::Error> for FolioError {
    fn from(e: quick_xml::Error) -> Self {
        FolioError::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for FolioError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        FolioError::Xml(e.to_string())
    }
}

impl From<lopdf::Error> for FolioError {
    fn from(e: lopdf::Error) -> Self {
        FolioError::Pdf(e.to_string())
    }
}
