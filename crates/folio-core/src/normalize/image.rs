use std::path::Path;

use crate::error::FolioError;
use crate::extraction::ocr::{OcrCapability, OCR_UNAVAILABLE};
use crate::model::Page;

/// OCR an image file into a single page. Images never carry tables.
pub fn extract_pages(ocr: &OcrCapability, path: &Path) -> Result<Vec<Page>, FolioError> {
    let Some(engine) = ocr.engine() else {
        return Ok(vec![Page::new(1, OCR_UNAVAILABLE, Vec::new())]);
    };
    let lines = engine.recognize(path)?;
    Ok(vec![Page::new(1, lines.join("\n"), Vec::new())])
}
