use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::classify::{extension_of, is_supported};
use crate::cleanup::{remove_dir_with_retry, RetryPolicy, ScratchDir};
use crate::error::FolioError;
use crate::extractor::{file_name_of, Extractor};
use crate::model::{BatchEntry, BatchResult, FailureRecord, FailureStatus};

pub const EXTRACTION_FAILED: &str = "Extraction failed";

/// Runs an [`Extractor`] over many files. A member that fails to extract
/// becomes a [`FailureRecord`]; the rest of the batch continues.
pub struct BatchProcessor<'a> {
    extractor: &'a Extractor,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(extractor: &'a Extractor) -> Self {
        Self { extractor }
    }

    /// Expand a ZIP archive into a scratch directory and extract every
    /// member file in name order.
    ///
    /// Only a failure to open or expand the archive is an error.
    pub fn process(&self, archive: &Path) -> Result<BatchResult, FolioError> {
        let scratch = ScratchDir::new("folio-batch-", self.extractor.config().retry_policy())?;
        expand_archive(archive, scratch.path())?;

        let members = member_files(scratch.path());
        info!(archive = %archive.display(), members = members.len(), "archive expanded");

        Ok(self.process_files(&members))
    }

    /// Extract a list of loose files with per-file isolation.
    pub fn process_files(&self, files: &[PathBuf]) -> BatchResult {
        let total = files.len();
        let entries = files
            .iter()
            .enumerate()
            .map(|(i, path)| {
                info!("[{}/{}] {}", i + 1, total, file_name_of(path));
                self.process_one(path)
            })
            .collect();

        let result = BatchResult { entries };
        info!(
            processed = result.processed_count(),
            failed = result.failures().count(),
            "batch complete"
        );
        result
    }

    fn process_one(&self, path: &Path) -> BatchEntry {
        let file_name = file_name_of(path);
        if !is_supported(path) {
            return failure(
                file_name,
                format!("Unsupported format: {}", extension_of(path)),
                FailureStatus::Skipped,
            );
        }

        match self.extractor.try_extract(path) {
            Ok(Some(doc)) => BatchEntry::Document(doc),
            Ok(None) => failure(file_name, EXTRACTION_FAILED, FailureStatus::Failed),
            Err(e) => {
                error!(file = %file_name, "member failed: {e}");
                failure(file_name, e.to_string(), FailureStatus::Failed)
            }
        }
    }
}

fn failure(file_name: String, error: impl Into<String>, status: FailureStatus) -> BatchEntry {
    BatchEntry::Failure(FailureRecord {
        file_name,
        error: error.into(),
        status,
    })
}

/// Write every member of `archive` under `out_dir`, keeping the archive's
/// directory layout. Entries whose names escape `out_dir` are skipped.
pub fn expand_archive(archive: &Path, out_dir: &Path) -> Result<(), FolioError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping archive entry outside target directory");
            continue;
        };
        let target = out_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

/// All regular files under `dir`, sorted by file name at each level.
pub fn member_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Clear `out_dir`, expand `archive` into it and return the supported
/// member files in sorted order.
pub fn extract_zip(
    archive: &Path,
    out_dir: &Path,
    policy: RetryPolicy,
) -> Result<Vec<PathBuf>, FolioError> {
    if out_dir.exists() && !remove_dir_with_retry(out_dir, policy) {
        return Err(FolioError::Io(io::Error::other(format!(
            "could not clear {}",
            out_dir.display()
        ))));
    }
    fs::create_dir_all(out_dir)?;
    expand_archive(archive, out_dir)?;

    let mut files: Vec<PathBuf> = member_files(out_dir)
        .into_iter()
        .filter(|p| is_supported(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Pretty-printed JSON, UTF-8 with non-ASCII kept as is.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), FolioError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
