use folio_core::classify::{classify, extension_of, FileType};
use folio_core::error::FolioError;
use folio_core::extraction::ocr::OcrCapability;
use folio_core::Extractor;
use std::path::PathBuf;

pub fn run(input_file: PathBuf) -> Result<(), FolioError> {
    let file_type = classify(&input_file);
    match file_type {
        FileType::Unknown => {
            return Err(FolioError::UnsupportedFormat(extension_of(&input_file)));
        }
        FileType::Pdf => {
            // OCR is not needed to look at the text layer
            let extractor = Extractor::builder()
                .ocr(OcrCapability::unavailable("not needed"))
                .build();
            let kind = extractor.classify_pdf(&input_file);
            println!("{}: {} ({})", input_file.display(), file_type, kind);
        }
        _ => println!("{}: {}", input_file.display(), file_type),
    }
    Ok(())
}
