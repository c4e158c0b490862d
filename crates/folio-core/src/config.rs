use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cleanup::RetryPolicy;
use crate::error::FolioError;

/// Tunables for the extraction pipeline.
///
/// Every field has a default, so a TOML file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// A PDF is digital when the share of non-empty text blocks is strictly
    /// greater than this ratio.
    pub digital_text_ratio: f64,
    /// Rasterization resolution for scanned pages.
    pub ocr_dpi: u32,
    /// Tesseract language code.
    pub ocr_language: String,
    /// Digital-PDF text blocks shorter than this (after trimming) are noise.
    pub min_block_chars: usize,
    /// Lattice/stream candidates with fewer rows are discarded.
    pub min_table_rows: usize,
    /// Horizontal gap (points) that splits a text line into stream columns.
    pub stream_column_gap: f32,
    /// Distance (points) under which ruling lines are merged.
    pub ruling_tolerance: f32,
    pub cleanup_attempts: u32,
    pub cleanup_backoff_ms: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            digital_text_ratio: 0.3,
            ocr_dpi: 300,
            ocr_language: "eng".into(),
            min_block_chars: 3,
            min_table_rows: 2,
            stream_column_gap: 8.0,
            ruling_tolerance: 2.0,
            cleanup_attempts: 5,
            cleanup_backoff_ms: 500,
        }
    }
}

impl ExtractConfig {
    /// Load a config from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self, FolioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, FolioError> {
        let config: ExtractConfig =
            toml::from_str(content).map_err(|e| FolioError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FolioError> {
        if !(0.0..1.0).contains(&self.digital_text_ratio) {
            return Err(FolioError::Config(format!(
                "digital_text_ratio must be in [0, 1), got {}",
                self.digital_text_ratio
            )));
        }
        if self.ocr_dpi == 0 {
            return Err(FolioError::Config("ocr_dpi must be > 0".into()));
        }
        if self.ocr_language.trim().is_empty() {
            return Err(FolioError::Config("ocr_language must not be empty".into()));
        }
        if self.min_table_rows == 0 {
            return Err(FolioError::Config("min_table_rows must be >= 1".into()));
        }
        if self.stream_column_gap <= 0.0 || self.ruling_tolerance < 0.0 {
            return Err(FolioError::Config(
                "stream_column_gap must be > 0 and ruling_tolerance >= 0".into(),
            ));
        }
        if self.cleanup_attempts == 0 {
            return Err(FolioError::Config("cleanup_attempts must be >= 1".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.cleanup_attempts,
            backoff: Duration::from_millis(self.cleanup_backoff_ms),
        }
    }
}
