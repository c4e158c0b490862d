use folio_core::{BatchEntry, Document};

const PREVIEW_LINES: usize = 5;

/// One line per entry on stderr, then totals.
pub fn print_summary(entries: &[BatchEntry]) {
    let max_name = entries
        .iter()
        .map(|e| e.file_name().chars().count())
        .max()
        .unwrap_or(10);

    for entry in entries {
        match entry {
            BatchEntry::Document(doc) => eprintln!(
                "  {:<width$}  {:<8} {} page(s), {} table(s)",
                doc.file_name,
                doc.source_kind.to_string(),
                doc.total_pages,
                doc.table_count(),
                width = max_name
            ),
            BatchEntry::Failure(f) => eprintln!(
                "  {:<width$}  {:<8} {}",
                f.file_name,
                f.status.to_string(),
                f.error,
                width = max_name
            ),
        }
    }

    let processed = entries.iter().filter(|e| e.as_document().is_some()).count();
    eprintln!("\nProcessed {} of {} file(s)", processed, entries.len());
}

pub fn print_document(doc: &Document) {
    println!("=== {} ===\n", doc.file_name);
    println!("  Type:  {}", doc.source_kind);
    println!("  Pages: {}", doc.total_pages);
    println!("  Tables: {}\n", doc.table_count());

    for page in &doc.pages {
        println!("--- Page {} ---", page.page_no);

        let lines: Vec<&str> = page.text.lines().filter(|l| !l.trim().is_empty()).collect();
        for line in lines.iter().take(PREVIEW_LINES) {
            println!("  {line}");
        }
        if lines.len() > PREVIEW_LINES {
            println!("  ... {} more line(s)", lines.len() - PREVIEW_LINES);
        }

        for (i, table) in page.tables.iter().enumerate() {
            let columns = table.iter().map(Vec::len).max().unwrap_or(0);
            let header = table.first().map(|r| r.join(" | ")).unwrap_or_default();
            println!("  Table {}: {} x {}  [{}]", i + 1, table.len(), columns, header);
        }
        println!();
    }
}
