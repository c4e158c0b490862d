use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::classify::FileType;
use crate::config::ExtractConfig;
use crate::error::FolioError;
use crate::extraction::lattice::LatticeStrategy;
use crate::extraction::stream::StreamStrategy;
use crate::extraction::PdfBackend;
use crate::model::Table;
use crate::normalize::xlsx;

/// Which pages a table strategy should look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSelector {
    #[default]
    All,
    /// A single 1-based page.
    Page(usize),
}

impl PageSelector {
    pub fn includes(&self, page_number: usize) -> bool {
        match self {
            PageSelector::All => true,
            PageSelector::Page(n) => *n == page_number,
        }
    }
}

/// A table attributed to the page it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    pub page_number: usize,
    pub rows: Table,
}

/// One way of finding table grids in a PDF.
pub trait TableStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Find tables on the selected pages. An empty result is a miss, not an
    /// error.
    fn extract(&self, pdf: &Path, pages: PageSelector) -> Result<Vec<PageTable>, FolioError>;
}

/// Runs table strategies in order until one finds something.
pub struct TableExtractor {
    strategies: Vec<Box<dyn TableStrategy>>,
    min_rows: usize,
}

impl TableExtractor {
    pub fn new(strategies: Vec<Box<dyn TableStrategy>>, min_rows: usize) -> Self {
        TableExtractor {
            strategies,
            min_rows,
        }
    }

    /// Lattice first, then stream.
    pub fn standard(backend: Arc<dyn PdfBackend>, config: &ExtractConfig) -> Self {
        Self::new(
            vec![
                Box::new(LatticeStrategy::new(backend.clone(), config.ruling_tolerance)),
                Box::new(StreamStrategy::new(backend, config.stream_column_gap)),
            ],
            config.min_table_rows,
        )
    }

    /// Tables for any supported file kind. Absence of tables is an empty list.
    pub fn extract(&self, file: &Path, kind: FileType, pages: PageSelector) -> Vec<Table> {
        match kind {
            FileType::Pdf => self
                .extract_pdf(file, pages)
                .into_iter()
                .map(|t| t.rows)
                .collect(),
            FileType::Excel => match xlsx::first_sheet_table(file) {
                Ok(Some(table)) => vec![table],
                Ok(None) => Vec::new(),
                Err(e) => {
                    debug!(file = %file.display(), "spreadsheet table read failed: {e}");
                    Vec::new()
                }
            },
            _ => Vec::new(),
        }
    }

    /// Run the fallback chain over a PDF. The first strategy with at least
    /// one table of `min_rows` or more wins.
    pub fn extract_pdf(&self, pdf: &Path, pages: PageSelector) -> Vec<PageTable> {
        for strategy in &self.strategies {
            match strategy.extract(pdf, pages) {
                Ok(found) => {
                    let kept: Vec<PageTable> = found
                        .into_iter()
                        .filter(|t| t.rows.len() >= self.min_rows)
                        .collect();
                    if !kept.is_empty() {
                        debug!(
                            strategy = strategy.name(),
                            tables = kept.len(),
                            "table strategy hit"
                        );
                        return kept;
                    }
                    debug!(strategy = strategy.name(), "table strategy found nothing");
                }
                Err(e) => {
                    debug!(strategy = strategy.name(), "table strategy failed: {e}");
                }
            }
        }
        Vec::new()
    }

    /// Document-wide run grouped by page number.
    pub fn extract_pdf_by_page(&self, pdf: &Path) -> BTreeMap<usize, Vec<Table>> {
        let mut by_page: BTreeMap<usize, Vec<Table>> = BTreeMap::new();
        for table in self.extract_pdf(pdf, PageSelector::All) {
            by_page.entry(table.page_number).or_default().push(table.rows);
        }
        by_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        result: Result<Vec<PageTable>, String>,
        calls: Arc<AtomicUsize>,
    }

    impl TableStrategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn extract(&self, _pdf: &Path, pages: PageSelector) -> Result<Vec<PageTable>, FolioError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(tables) => Ok(tables
                    .iter()
                    .filter(|t| pages.includes(t.page_number))
                    .cloned()
                    .collect()),
                Err(e) => Err(FolioError::Pdf(e.clone())),
            }
        }
    }

    fn table(page_number: usize, rows: usize) -> PageTable {
        PageTable {
            page_number,
            rows: (0..rows).map(|r| vec![format!("r{r}"), "x".into()]).collect(),
        }
    }

    fn strategy(
        name: &'static str,
        result: Result<Vec<PageTable>, String>,
    ) -> (Box<dyn TableStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Fixed {
                name,
                result,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[test]
    fn first_strategy_hit_skips_the_rest() {
        let (lattice, _) = strategy("lattice", Ok(vec![table(1, 3)]));
        let (stream, stream_calls) = strategy("stream", Ok(vec![table(1, 5)]));
        let extractor = TableExtractor::new(vec![lattice, stream], 2);

        let tables = extractor.extract_pdf(Path::new("x.pdf"), PageSelector::All);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(stream_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn error_and_single_row_results_fall_through() {
        let (lattice, _) = strategy("lattice", Err("no rulings".into()));
        let (stream, _) = strategy("stream", Ok(vec![table(2, 1), table(2, 4)]));
        let extractor = TableExtractor::new(vec![lattice, stream], 2);

        let tables = extractor.extract_pdf(Path::new("x.pdf"), PageSelector::All);
        assert_eq!(tables.len(), 1);
        assert!(tables.iter().all(|t| t.rows.len() >= 2));
    }

    #[test]
    fn only_single_row_candidates_gives_empty_list() {
        let (lattice, _) = strategy("lattice", Ok(vec![table(1, 1)]));
        let (stream, _) = strategy("stream", Ok(vec![]));
        let extractor = TableExtractor::new(vec![lattice, stream], 2);
        assert!(extractor
            .extract(Path::new("x.pdf"), FileType::Pdf, PageSelector::All)
            .is_empty());
    }

    #[test]
    fn groups_by_page() {
        let (lattice, _) = strategy("lattice", Ok(vec![table(1, 2), table(3, 2), table(1, 4)]));
        let extractor = TableExtractor::new(vec![lattice], 2);
        let by_page = extractor.extract_pdf_by_page(Path::new("x.pdf"));
        assert_eq!(by_page.get(&1).map(Vec::len), Some(2));
        assert_eq!(by_page.get(&3).map(Vec::len), Some(1));
        assert!(!by_page.contains_key(&2));
    }

    #[test]
    fn page_selector_is_forwarded() {
        let (lattice, _) = strategy("lattice", Ok(vec![table(1, 2), table(2, 2)]));
        let extractor = TableExtractor::new(vec![lattice], 2);
        let tables = extractor.extract_pdf(Path::new("x.pdf"), PageSelector::Page(2));
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page_number, 2);
    }

    #[test]
    fn unsupported_kinds_have_no_tables() {
        let extractor = TableExtractor::new(vec![], 2);
        assert!(extractor
            .extract(Path::new("scan.png"), FileType::Image, PageSelector::All)
            .is_empty());
    }
}
