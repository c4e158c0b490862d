use folio_core::error::FolioError;
use std::path::PathBuf;

use crate::commands::{build_extractor, load_config};
use crate::output;

pub fn run(
    input_file: PathBuf,
    output_format: &str,
    config_file: Option<PathBuf>,
) -> Result<(), FolioError> {
    let config = load_config(config_file.as_deref())?;
    let extractor = build_extractor(config, false);

    let doc = extractor
        .try_extract(&input_file)?
        .ok_or_else(|| FolioError::UnsupportedFormat(input_file.display().to_string()))?;

    match output_format {
        "json" => output::json::print(&doc)?,
        _ => output::table::print_document(&doc),
    }

    Ok(())
}
