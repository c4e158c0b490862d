use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::classify::{classify, is_digital, FileType};
use crate::config::ExtractConfig;
use crate::error::FolioError;
use crate::extraction::ocr::OcrCapability;
use crate::extraction::pdftotext::PopplerBackend;
use crate::extraction::table::{TableExtractor, TableStrategy};
use crate::extraction::PdfBackend;
use crate::model::{Document, Page, SourceKind};
use crate::normalize::{docx, image, pdf, xlsx};

/// Turns one input file into a [`Document`].
///
/// Holds the injected capabilities: PDF backend, OCR, table strategies.
pub struct Extractor {
    backend: Arc<dyn PdfBackend>,
    ocr: OcrCapability,
    tables: TableExtractor,
    config: ExtractConfig,
}

#[derive(Default)]
pub struct ExtractorBuilder {
    config: ExtractConfig,
    backend: Option<Arc<dyn PdfBackend>>,
    ocr: Option<OcrCapability>,
    strategies: Option<Vec<Box<dyn TableStrategy>>>,
}

impl ExtractorBuilder {
    pub fn config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pdf_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn ocr(mut self, ocr: OcrCapability) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn table_strategies(mut self, strategies: Vec<Box<dyn TableStrategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// Fill in defaults: poppler backend, tesseract OCR (initialized here if
    /// not supplied), lattice then stream.
    pub fn build(self) -> Extractor {
        let config = self.config;
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(PopplerBackend::new()));
        let ocr = self.ocr.unwrap_or_else(|| OcrCapability::init(&config));
        let tables = match self.strategies {
            Some(strategies) => TableExtractor::new(strategies, config.min_table_rows),
            None => TableExtractor::standard(backend.clone(), &config),
        };
        Extractor {
            backend,
            ocr,
            tables,
            config,
        }
    }
}

impl Extractor {
    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::default()
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    pub fn ocr(&self) -> &OcrCapability {
        &self.ocr
    }

    pub fn ocr_mut(&mut self) -> &mut OcrCapability {
        &mut self.ocr
    }

    /// Digital or scanned, by text-block ratio.
    pub fn classify_pdf(&self, path: &Path) -> SourceKind {
        if is_digital(self.backend.as_ref(), path, self.config.digital_text_ratio) {
            SourceKind::PdfDigital
        } else {
            SourceKind::PdfScanned
        }
    }

    /// Source kind for a path, or `None` for unsupported extensions.
    pub fn source_kind(&self, path: &Path) -> Option<SourceKind> {
        match classify(path) {
            FileType::Pdf => Some(self.classify_pdf(path)),
            FileType::Docx => Some(SourceKind::Docx),
            FileType::Excel => Some(SourceKind::Excel),
            FileType::Image => Some(SourceKind::Image),
            FileType::Unknown => None,
        }
    }

    fn normalize(&self, path: &Path, kind: SourceKind) -> Result<Vec<Page>, FolioError> {
        match kind {
            SourceKind::PdfDigital => pdf::extract_digital(
                self.backend.as_ref(),
                &self.tables,
                path,
                self.config.min_block_chars,
            ),
            SourceKind::PdfScanned => {
                pdf::extract_scanned(self.backend.as_ref(), &self.ocr, path, &self.config)
            }
            SourceKind::Docx => docx::extract_pages(path),
            SourceKind::Excel => xlsx::extract_pages(path),
            SourceKind::Image => image::extract_pages(&self.ocr, path),
        }
    }

    /// Extract a document, propagating normalizer failures.
    ///
    /// `Ok(None)` means the extension is not supported.
    pub fn try_extract(&self, path: &Path) -> Result<Option<Document>, FolioError> {
        let Some(kind) = self.source_kind(path) else {
            return Ok(None);
        };
        let pages = self.normalize(path, kind)?;
        info!(file = %path.display(), %kind, pages = pages.len(), "extracted");
        Ok(Some(Document::new(file_name_of(path), kind, pages)))
    }

    /// Extract a document. A file that cannot be parsed still yields a
    /// document, with no pages.
    pub fn extract(&self, path: &Path) -> Option<Document> {
        let kind = self.source_kind(path)?;
        let pages = self.normalize(path, kind).unwrap_or_else(|e| {
            error!(file = %path.display(), %kind, "extraction failed: {e}");
            Vec::new()
        });
        Some(Document::new(file_name_of(path), kind, pages))
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
