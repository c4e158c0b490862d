use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extraction::{PageBlocks, PdfBackend};

/// Extensions the extractor accepts, lowercase with leading dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".pdf", ".docx", ".doc", ".xlsx", ".xls", ".png", ".jpg", ".jpeg", ".bmp", ".tiff",
];

pub const ARCHIVE_EXTENSION: &str = ".zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Excel,
    Image,
    Unknown,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Pdf => write!(f, "pdf"),
            FileType::Docx => write!(f, "docx"),
            FileType::Excel => write!(f, "excel"),
            FileType::Image => write!(f, "image"),
            FileType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Lowercased extension with a leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Map a path to its file type by extension, case-insensitively.
pub fn classify(path: &Path) -> FileType {
    match extension_of(path).as_str() {
        ".pdf" => FileType::Pdf,
        ".docx" | ".doc" => FileType::Docx,
        ".xlsx" | ".xls" => FileType::Excel,
        ".png" | ".jpg" | ".jpeg" | ".bmp" | ".tiff" => FileType::Image,
        _ => FileType::Unknown,
    }
}

pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(path).as_str())
}

pub fn is_archive(path: &Path) -> bool {
    extension_of(path) == ARCHIVE_EXTENSION
}

/// Share of blocks that hold non-whitespace text, or `None` without blocks.
pub fn textual_ratio(pages: &[PageBlocks]) -> Option<f64> {
    let (textual, total) = pages
        .iter()
        .flat_map(|p| p.blocks.iter())
        .fold((0usize, 0usize), |(t, n), b| {
            (t + usize::from(b.is_textual()), n + 1)
        });
    if total == 0 {
        None
    } else {
        Some(textual as f64 / total as f64)
    }
}

/// Decide whether a PDF carries machine-readable text.
///
/// Digital iff the textual-block ratio is strictly greater than `threshold`.
/// A PDF that cannot be parsed is treated as scanned, since the OCR path can
/// always be attempted.
pub fn is_digital(backend: &dyn PdfBackend, pdf: &Path, threshold: f64) -> bool {
    match backend.page_blocks(pdf) {
        Ok(pages) => {
            let ratio = textual_ratio(&pages);
            debug!(file = %pdf.display(), ?ratio, threshold, "text block ratio");
            ratio.is_some_and(|r| r > threshold)
        }
        Err(e) => {
            warn!(file = %pdf.display(), "could not read PDF text layer, treating as scanned: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{BBox, TextBlock, TextLine, Word};

    #[test]
    fn classify_by_extension() {
        assert_eq!(classify(Path::new("a.pdf")), FileType::Pdf);
        assert_eq!(classify(Path::new("b.DOCX")), FileType::Docx);
        assert_eq!(classify(Path::new("b.doc")), FileType::Docx);
        assert_eq!(classify(Path::new("c.Xls")), FileType::Excel);
        assert_eq!(classify(Path::new("dir/scan.TIFF")), FileType::Image);
        assert_eq!(classify(Path::new("scan.jpeg")), FileType::Image);
        assert_eq!(classify(Path::new("notes.txt")), FileType::Unknown);
        assert_eq!(classify(Path::new("bundle.zip")), FileType::Unknown);
        assert_eq!(classify(Path::new("no_extension")), FileType::Unknown);
    }

    #[test]
    fn supported_and_archive() {
        assert!(is_supported(Path::new("x.JPG")));
        assert!(!is_supported(Path::new("x.tif")));
        assert!(!is_supported(Path::new("x.zip")));
        assert!(is_archive(Path::new("x.ZIP")));
    }

    fn block(text: &str) -> TextBlock {
        let bbox = BBox {
            x_min: 0.0,
            y_min: 0.0,
            x_max: 10.0,
            y_max: 10.0,
        };
        TextBlock {
            bbox,
            lines: vec![TextLine {
                bbox,
                words: vec![Word {
                    text: text.into(),
                    bbox,
                }],
            }],
        }
    }

    fn pages(textual: usize, blank: usize) -> Vec<PageBlocks> {
        let mut blocks: Vec<TextBlock> = (0..textual).map(|_| block("text")).collect();
        blocks.extend((0..blank).map(|_| block("   ")));
        vec![PageBlocks {
            page_number: 1,
            width: 612.0,
            height: 792.0,
            blocks,
        }]
    }

    #[test]
    fn ratio_counts_whitespace_blocks_as_non_textual() {
        assert_eq!(textual_ratio(&pages(1, 3)), Some(0.25));
        assert_eq!(textual_ratio(&[]), None);
    }
}
