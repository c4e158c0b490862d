use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ExtractConfig;
use crate::error::FolioError;
use crate::extraction::pdftotext::run_tool;
use crate::extraction::OcrEngine;

/// Page text used when no OCR engine could be initialized.
pub const OCR_UNAVAILABLE: &str = "OCR unavailable";

/// OCR engine backed by the `tesseract` command line tool.
///
/// Install: `apt install tesseract-ocr` (Linux) or `brew install tesseract` (macOS).
pub struct TesseractEngine {
    language: String,
}

impl TesseractEngine {
    /// Verify that tesseract can be executed.
    pub fn detect(language: &str) -> Result<Self, FolioError> {
        run_tool("tesseract", Command::new("tesseract").arg("--version"))?;
        Ok(TesseractEngine {
            language: language.to_string(),
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &Path) -> Result<Vec<String>, FolioError> {
        let output = run_tool(
            "tesseract",
            Command::new("tesseract")
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(&self.language),
        )?;
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn engine_name(&self) -> &str {
        "tesseract"
    }
}

/// Process-wide OCR capability.
///
/// Initialized once and shared read-only; cloning shares the same engine.
#[derive(Clone)]
pub struct OcrCapability {
    engine: Option<Arc<dyn OcrEngine>>,
    reason: Option<String>,
}

impl OcrCapability {
    /// Initialize the default tesseract engine. Failure leaves the capability
    /// unavailable instead of returning an error.
    pub fn init(config: &ExtractConfig) -> Self {
        match TesseractEngine::detect(&config.ocr_language) {
            Ok(engine) => {
                info!(language = %config.ocr_language, "tesseract OCR initialized");
                Self::with_engine(Arc::new(engine))
            }
            Err(e) => {
                warn!("OCR init failed: {e}");
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn with_engine(engine: Arc<dyn OcrEngine>) -> Self {
        OcrCapability {
            engine: Some(engine),
            reason: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        OcrCapability {
            engine: None,
            reason: Some(reason.into()),
        }
    }

    pub fn engine(&self) -> Option<&dyn OcrEngine> {
        self.engine.as_deref()
    }

    /// Why the capability is unavailable, if it is.
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Release this handle's engine. Other clones keep theirs until dropped.
    pub fn shutdown(&mut self) {
        if let Some(engine) = self.engine.take() {
            info!(engine = engine.engine_name(), "OCR capability shut down");
            self.reason = Some("shut down".into());
        }
    }
}

impl std::fmt::Debug for OcrCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrCapability")
            .field("engine", &self.engine.as_ref().map(|e| e.engine_name()))
            .field("reason", &self.reason)
            .finish()
    }
}
