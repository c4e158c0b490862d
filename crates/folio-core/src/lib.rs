pub mod batch;
pub mod classify;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod extraction;
pub mod extractor;
pub mod model;
pub mod normalize;

use std::path::{Path, PathBuf};

pub use batch::{write_json, BatchProcessor};
pub use classify::{classify, FileType};
pub use config::ExtractConfig;
pub use error::FolioError;
pub use extractor::{Extractor, ExtractorBuilder};
pub use model::{BatchEntry, BatchResult, Document, FailureRecord, FailureStatus, Page, SourceKind};

/// Extract one file with the default capabilities (poppler, tesseract when
/// installed) and default configuration.
///
/// Returns `None` for unsupported extensions. A file that fails to parse
/// yields a document with no pages.
pub fn extract_document(path: &Path) -> Option<Document> {
    Extractor::builder().build().extract(path)
}

/// Expand an uploaded archive into `out_dir` (cleared first) and list the
/// supported member files.
pub fn extract_zip(archive: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, FolioError> {
    batch::extract_zip(archive, out_dir, ExtractConfig::default().retry_policy())
}
