use std::path::Path;

use tracing::{debug, warn};

use crate::cleanup::{remove_file_with_retry, ScratchDir};
use crate::config::ExtractConfig;
use crate::error::FolioError;
use crate::extraction::ocr::{OcrCapability, OCR_UNAVAILABLE};
use crate::extraction::table::TableExtractor;
use crate::extraction::{PageBlocks, PdfBackend};
use crate::model::Page;

/// Pages of a PDF with a text layer.
///
/// Blocks are read top-to-bottom then left-to-right; blocks shorter than
/// `min_block_chars` after trimming are dropped. Tables come from one
/// document-wide lattice/stream run.
pub fn extract_digital(
    backend: &dyn PdfBackend,
    tables: &TableExtractor,
    pdf: &Path,
    min_block_chars: usize,
) -> Result<Vec<Page>, FolioError> {
    let pages = backend.page_blocks(pdf)?;
    let mut by_page = tables.extract_pdf_by_page(pdf);

    Ok(pages
        .iter()
        .enumerate()
        .map(|(i, blocks)| {
            let page_no = i + 1;
            Page::new(
                page_no,
                page_text(blocks, min_block_chars),
                by_page.remove(&page_no).unwrap_or_default(),
            )
        })
        .collect())
}

/// Reading-order text of one page, blocks separated by a blank line.
pub fn page_text(page: &PageBlocks, min_block_chars: usize) -> String {
    let mut blocks: Vec<_> = page.blocks.iter().collect();
    blocks.sort_by(|a, b| {
        a.bbox
            .y_min
            .total_cmp(&b.bbox.y_min)
            .then(a.bbox.x_min.total_cmp(&b.bbox.x_min))
    });

    blocks
        .into_iter()
        .map(|b| b.text().trim().to_string())
        .filter(|t| t.chars().count() >= min_block_chars)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Pages of an image-only PDF, recognized one page at a time.
///
/// Page images live in a scratch directory that is removed when this
/// returns, whether recognition succeeded or not.
pub fn extract_scanned(
    backend: &dyn PdfBackend,
    ocr: &OcrCapability,
    pdf: &Path,
    config: &ExtractConfig,
) -> Result<Vec<Page>, FolioError> {
    let page_count = backend.page_blocks(pdf)?.len();

    let Some(engine) = ocr.engine() else {
        return Ok((1..=page_count)
            .map(|n| Page::new(n, OCR_UNAVAILABLE, Vec::new()))
            .collect());
    };

    let policy = config.retry_policy();
    let scratch = ScratchDir::new("folio-ocr-", policy)?;
    let mut pages = Vec::with_capacity(page_count);

    for page_no in 1..=page_count {
        let image = backend.render_page(pdf, page_no, config.ocr_dpi, scratch.path())?;
        let text = match engine.recognize(&image) {
            Ok(lines) => lines.join("\n"),
            Err(e) => {
                warn!(file = %pdf.display(), page_no, "OCR failed: {e}");
                String::new()
            }
        };
        remove_file_with_retry(&image, policy);
        debug!(page_no, chars = text.len(), "page recognized");
        pages.push(Page::new(page_no, text, Vec::new()));
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{BBox, TextBlock, TextLine, Word};

    fn block(text: &str, x: f32, y: f32) -> TextBlock {
        let bbox = BBox {
            x_min: x,
            y_min: y,
            x_max: x + 100.0,
            y_max: y + 10.0,
        };
        TextBlock {
            bbox,
            lines: vec![TextLine {
                bbox,
                words: text
                    .split(' ')
                    .map(|w| Word {
                        text: w.into(),
                        bbox,
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn blocks_in_reading_order_with_noise_dropped() {
        let page = PageBlocks {
            page_number: 1,
            width: 612.0,
            height: 792.0,
            blocks: vec![
                block("Right column", 300.0, 100.0),
                block("Footer text", 50.0, 700.0),
                block("Left column", 50.0, 100.0),
                block("42", 50.0, 400.0),
                block("Title of challan", 50.0, 40.0),
            ],
        };
        assert_eq!(
            page_text(&page, 3),
            "Title of challan\n\nLeft column\n\nRight column\n\nFooter text"
        );
    }

    #[test]
    fn three_char_blocks_survive() {
        let page = PageBlocks {
            page_number: 1,
            width: 612.0,
            height: 792.0,
            blocks: vec![block("TDS", 0.0, 0.0), block("No", 0.0, 20.0)],
        };
        assert_eq!(page_text(&page, 3), "TDS");
    }
}
