use folio_core::batch::{write_json, BatchProcessor};
use folio_core::classify::is_archive;
use folio_core::error::FolioError;
use folio_core::BatchEntry;
use std::path::PathBuf;

use crate::commands::{build_extractor, load_config};
use crate::output;

pub fn run(
    input_file: PathBuf,
    out: PathBuf,
    config_file: Option<PathBuf>,
    ocr_disabled: bool,
) -> Result<(), FolioError> {
    let config = load_config(config_file.as_deref())?;
    let mut extractor = build_extractor(config, ocr_disabled);
    if let Some(reason) = extractor.ocr().unavailable_reason() {
        eprintln!("OCR unavailable ({reason}); scanned pages and images get placeholder text");
    }

    let entries = if is_archive(&input_file) {
        BatchProcessor::new(&extractor)
            .process(&input_file)
            .map(|result| result.entries)
    } else {
        extractor
            .extract(&input_file)
            .map(|doc| vec![BatchEntry::Document(doc)])
            .ok_or_else(|| FolioError::UnsupportedFormat(input_file.display().to_string()))
    };
    extractor.ocr_mut().shutdown();
    let entries = entries?;

    // Always a JSON array, even for a single document
    write_json(&out, &entries)?;
    output::table::print_summary(&entries);
    eprintln!("Written to {}", out.display());

    Ok(())
}
