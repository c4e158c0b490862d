pub mod lattice;
pub mod ocr;
pub mod pdftotext;
pub mod stream;
pub mod table;

use std::path::{Path, PathBuf};

use crate::error::FolioError;

/// Axis-aligned box in page space, origin top-left, units in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn center(&self) -> (f32, f32) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub bbox: BBox,
    pub words: Vec<Word>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A positioned block of text as the PDF layout engine grouped it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub bbox: BBox,
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True if the block holds any non-whitespace content.
    pub fn is_textual(&self) -> bool {
        self.lines
            .iter()
            .flat_map(|l| l.words.iter())
            .any(|w| !w.text.trim().is_empty())
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }
}

/// Text blocks of a single page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBlocks {
    pub page_number: usize,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<TextBlock>,
}

impl PageBlocks {
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.blocks.iter().flat_map(|b| b.words())
    }
}

/// PDF parsing and rasterization backend.
pub trait PdfBackend: Send + Sync {
    /// Per-page text blocks with positions, one entry per page in order.
    fn page_blocks(&self, pdf: &Path) -> Result<Vec<PageBlocks>, FolioError>;

    /// Render one page (1-based) to a PNG inside `out_dir` and return its path.
    fn render_page(
        &self,
        pdf: &Path,
        page_number: usize,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<PathBuf, FolioError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Optical character recognition over a raster image.
pub trait OcrEngine: Send + Sync {
    /// Recognized text lines in reading order.
    fn recognize(&self, image: &Path) -> Result<Vec<String>, FolioError>;

    fn engine_name(&self) -> &str;
}
