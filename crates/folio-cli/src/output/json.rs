use folio_core::error::FolioError;
use folio_core::Document;

pub fn print(doc: &Document) -> Result<(), FolioError> {
    let json = serde_json::to_string_pretty(doc)?;
    println!("{json}");
    Ok(())
}
