use std::path::Path;
use std::sync::Arc;

use crate::error::FolioError;
use crate::extraction::table::{PageSelector, PageTable, TableStrategy};
use crate::extraction::{PageBlocks, PdfBackend, Word};
use crate::model::Table;

/// Table detection from whitespace alignment, for tables without ruling
/// lines.
///
/// Words are grouped into visual rows, rows are split into segments at wide
/// horizontal gaps, and runs of consecutive multi-segment rows become tables
/// whose columns are the merged x-ranges of their segments.
pub struct StreamStrategy {
    backend: Arc<dyn PdfBackend>,
    column_gap: f32,
}

impl StreamStrategy {
    pub fn new(backend: Arc<dyn PdfBackend>, column_gap: f32) -> Self {
        StreamStrategy {
            backend,
            column_gap,
        }
    }
}

impl TableStrategy for StreamStrategy {
    fn name(&self) -> &str {
        "stream"
    }

    fn extract(&self, pdf: &Path, pages: PageSelector) -> Result<Vec<PageTable>, FolioError> {
        let mut out = Vec::new();
        for page in self.backend.page_blocks(pdf)? {
            if !pages.includes(page.page_number) {
                continue;
            }
            for rows in page_tables(&page, self.column_gap) {
                out.push(PageTable {
                    page_number: page.page_number,
                    rows,
                });
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
struct Segment {
    text: String,
    x_min: f32,
    x_max: f32,
}

#[derive(Debug)]
struct WordRow<'a> {
    y_center: f32,
    y_min: f32,
    y_max: f32,
    words: Vec<&'a Word>,
}

fn page_tables(page: &PageBlocks, column_gap: f32) -> Vec<Table> {
    let rows = group_rows(page.words().filter(|w| !w.text.trim().is_empty()));
    let segmented: Vec<(f32, f32, Vec<Segment>)> = rows
        .iter()
        .map(|r| (r.y_min, r.y_max, segments(&r.words, column_gap)))
        .collect();

    let mut tables = Vec::new();
    let mut region: Vec<&Vec<Segment>> = Vec::new();
    let mut last_bottom: Option<f32> = None;
    let mut last_height = 0.0_f32;

    for (y_min, y_max, segs) in &segmented {
        let far = last_bottom
            .map(|bottom| y_min - bottom > 2.0 * last_height.max(1.0))
            .unwrap_or(false);
        if segs.len() < 2 || far {
            flush(&mut region, &mut tables);
        }
        if segs.len() >= 2 {
            region.push(segs);
        }
        last_bottom = Some(*y_max);
        last_height = y_max - y_min;
    }
    flush(&mut region, &mut tables);
    tables
}

fn flush(region: &mut Vec<&Vec<Segment>>, tables: &mut Vec<Table>) {
    if region.len() >= 2 {
        tables.push(build_table(region));
    }
    region.clear();
}

/// Cluster words into rows by vertical center.
fn group_rows<'a>(words: impl Iterator<Item = &'a Word>) -> Vec<WordRow<'a>> {
    let mut sorted: Vec<&Word> = words.collect();
    sorted.sort_by(|a, b| a.bbox.center().1.total_cmp(&b.bbox.center().1));

    let mut rows: Vec<WordRow> = Vec::new();
    for word in sorted {
        let (_, cy) = word.bbox.center();
        let tolerance = word.bbox.height() / 2.0;
        match rows.last_mut() {
            Some(row) if (cy - row.y_center).abs() <= tolerance => {
                row.y_min = row.y_min.min(word.bbox.y_min);
                row.y_max = row.y_max.max(word.bbox.y_max);
                row.words.push(word);
            }
            _ => rows.push(WordRow {
                y_center: cy,
                y_min: word.bbox.y_min,
                y_max: word.bbox.y_max,
                words: vec![word],
            }),
        }
    }
    for row in &mut rows {
        row.words
            .sort_by(|a, b| a.bbox.x_min.total_cmp(&b.bbox.x_min));
    }
    rows
}

/// Split a row (words sorted by x) wherever the gap exceeds `column_gap`.
fn segments(words: &[&Word], column_gap: f32) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for word in words {
        match out.last_mut() {
            Some(seg) if word.bbox.x_min - seg.x_max <= column_gap => {
                seg.text.push(' ');
                seg.text.push_str(word.text.trim());
                seg.x_max = seg.x_max.max(word.bbox.x_max);
            }
            _ => out.push(Segment {
                text: word.text.trim().to_string(),
                x_min: word.bbox.x_min,
                x_max: word.bbox.x_max,
            }),
        }
    }
    out
}

fn build_table(region: &[&Vec<Segment>]) -> Table {
    let columns = merge_columns(region);
    region
        .iter()
        .map(|segs| {
            let mut row = vec![String::new(); columns.len()];
            for seg in segs.iter() {
                let center = (seg.x_min + seg.x_max) / 2.0;
                let idx = columns
                    .iter()
                    .position(|(lo, hi)| center >= *lo && center <= *hi)
                    .unwrap_or_else(|| nearest_column(&columns, center));
                if !row[idx].is_empty() {
                    row[idx].push(' ');
                }
                row[idx].push_str(&seg.text);
            }
            row
        })
        .collect()
}

/// Union of overlapping segment x-ranges, left to right.
fn merge_columns(region: &[&Vec<Segment>]) -> Vec<(f32, f32)> {
    let mut spans: Vec<(f32, f32)> = region
        .iter()
        .flat_map(|segs| segs.iter().map(|s| (s.x_min, s.x_max)))
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f32, f32)> = Vec::new();
    for (lo, hi) in spans {
        match merged.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

fn nearest_column(columns: &[(f32, f32)], x: f32) -> usize {
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (a.0 - x).abs().min((a.1 - x).abs());
            let db = (b.0 - x).abs().min((b.1 - x).abs());
            da.total_cmp(&db)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{BBox, TextBlock, TextLine};

    fn word(text: &str, x: f32, y: f32) -> Word {
        Word {
            text: text.into(),
            bbox: BBox {
                x_min: x,
                y_min: y,
                x_max: x + 6.0 * text.len() as f32,
                y_max: y + 10.0,
            },
        }
    }

    fn page(words: Vec<Word>) -> PageBlocks {
        PageBlocks {
            page_number: 1,
            width: 612.0,
            height: 792.0,
            blocks: vec![TextBlock {
                bbox: BBox {
                    x_min: 0.0,
                    y_min: 0.0,
                    x_max: 612.0,
                    y_max: 792.0,
                },
                lines: vec![TextLine {
                    bbox: BBox {
                        x_min: 0.0,
                        y_min: 0.0,
                        x_max: 612.0,
                        y_max: 792.0,
                    },
                    words,
                }],
            }],
        }
    }

    #[test]
    fn aligned_columns_become_a_table() {
        let p = page(vec![
            word("Section", 50.0, 100.0),
            word("Amount", 200.0, 100.0),
            word("194C", 50.0, 112.0),
            word("1200.00", 200.0, 112.0),
            word("194J", 50.0, 124.0),
            word("300.00", 200.0, 124.0),
        ]);
        let tables = page_tables(&p, 8.0);
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0],
            vec![
                vec!["Section".to_string(), "Amount".to_string()],
                vec!["194C".to_string(), "1200.00".to_string()],
                vec!["194J".to_string(), "300.00".to_string()],
            ]
        );
    }

    #[test]
    fn prose_lines_are_not_tables() {
        let p = page(vec![
            word("This", 50.0, 100.0),
            word("is", 77.0, 100.0),
            word("prose", 92.0, 100.0),
            word("More", 50.0, 112.0),
            word("prose", 77.0, 112.0),
        ]);
        assert!(page_tables(&p, 8.0).is_empty());
    }

    #[test]
    fn missing_cell_leaves_empty_string() {
        let p = page(vec![
            word("A", 50.0, 100.0),
            word("B", 150.0, 100.0),
            word("C", 250.0, 100.0),
            word("1", 50.0, 112.0),
            word("3", 250.0, 112.0),
        ]);
        let tables = page_tables(&p, 8.0);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0][1], vec!["1".to_string(), String::new(), "3".to_string()]);
    }
}
