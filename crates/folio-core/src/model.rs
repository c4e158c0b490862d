use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of display strings.
pub type Row = Vec<String>;

/// A grid of cells, rows in source order.
pub type Table = Vec<Row>;

/// Where a document's pages came from. Serialized under `pdf_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[serde(rename = "digital")]
    PdfDigital,
    #[serde(rename = "scanned")]
    PdfScanned,
    Docx,
    Excel,
    Image,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::PdfDigital => write!(f, "digital"),
            SourceKind::PdfScanned => write!(f, "scanned"),
            SourceKind::Docx => write!(f, "docx"),
            SourceKind::Excel => write!(f, "excel"),
            SourceKind::Image => write!(f, "image"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page_no: usize,
    pub text: String,
    pub tables: Vec<Table>,
}

impl Page {
    pub fn new(page_no: usize, text: impl Into<String>, tables: Vec<Table>) -> Self {
        Page {
            page_no,
            text: text.into(),
            tables,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub file_name: String,
    #[serde(rename = "pdf_type")]
    pub source_kind: SourceKind,
    pub total_pages: usize,
    pub pages: Vec<Page>,
}

impl Document {
    /// Build a document, deriving `total_pages` from the page list.
    pub fn new(file_name: impl Into<String>, source_kind: SourceKind, pages: Vec<Page>) -> Self {
        Document {
            file_name: file_name.into(),
            source_kind,
            total_pages: pages.len(),
            pages,
        }
    }

    pub fn table_count(&self) -> usize {
        self.pages.iter().map(|p| p.tables.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStatus {
    Failed,
    Skipped,
}

impl fmt::Display for FailureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStatus::Failed => write!(f, "failed"),
            FailureStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub file_name: String,
    pub error: String,
    pub status: FailureStatus,
}

/// A batch member outcome. Untagged, so documents serialize exactly like
/// single-file output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Document(Document),
    Failure(FailureRecord),
}

impl BatchEntry {
    pub fn file_name(&self) -> &str {
        match self {
            BatchEntry::Document(d) => &d.file_name,
            BatchEntry::Failure(f) => &f.file_name,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            BatchEntry::Document(d) => Some(d),
            BatchEntry::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&FailureRecord> {
        match self {
            BatchEntry::Failure(f) => Some(f),
            BatchEntry::Document(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResult {
    pub entries: Vec<BatchEntry>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.entries.iter().filter_map(BatchEntry::as_document)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FailureRecord> {
        self.entries.iter().filter_map(BatchEntry::as_failure)
    }

    /// Number of members that produced a document.
    pub fn processed_count(&self) -> usize {
        self.documents().count()
    }
}
