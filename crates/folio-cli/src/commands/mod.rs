pub mod classify;
pub mod extract;
pub mod inspect;

use folio_core::error::FolioError;
use folio_core::extraction::ocr::OcrCapability;
use folio_core::{ExtractConfig, Extractor};
use std::path::Path;

pub(crate) fn load_config(path: Option<&Path>) -> Result<ExtractConfig, FolioError> {
    match path {
        Some(path) => ExtractConfig::load(path),
        None => Ok(ExtractConfig::default()),
    }
}

pub(crate) fn build_extractor(config: ExtractConfig, ocr_disabled: bool) -> Extractor {
    let builder = Extractor::builder();
    let builder = if ocr_disabled {
        builder.ocr(OcrCapability::unavailable("disabled on the command line"))
    } else {
        builder
    };
    builder.config(config).build()
}
