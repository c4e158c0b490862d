use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::FolioError;
use crate::model::{Page, Row, Table};

/// Body content of a Word document: paragraph text and tables, each in
/// document order but collected separately.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocxContent {
    pub paragraphs: Vec<String>,
    pub tables: Vec<Table>,
}

/// Normalize a DOCX file into a single page.
pub fn extract_pages(path: &Path) -> Result<Vec<Page>, FolioError> {
    let content = read_body(path)?;
    Ok(vec![Page::new(1, content.paragraphs.join("\n\n"), content.tables)])
}

pub fn read_body(path: &Path) -> Result<DocxContent, FolioError> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| FolioError::parse(path, e))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| FolioError::parse(path, e))?
        .read_to_string(&mut xml)?;
    parse_document_xml(&xml).map_err(|e| FolioError::parse(path, e))
}

#[derive(Debug, Default)]
struct TableBuilder {
    nesting: usize,
    rows: Vec<Row>,
    row: Option<Row>,
    cell: Option<String>,
}

/// Parse `word/document.xml`.
///
/// Only body-level `w:p` and `w:tbl` are considered. Text of a table nested
/// inside a cell is folded into that cell.
pub fn parse_document_xml(xml: &str) -> Result<DocxContent, FolioError> {
    let mut reader = Reader::from_str(xml);
    let mut out = DocxContent::default();

    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    let mut paragraph: Option<String> = None;
    let mut table: Option<TableBuilder> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                let body_level = body_depth == Some(depth - 1);
                match e.local_name().as_ref() {
                    b"body" if body_depth.is_none() => body_depth = Some(depth),
                    b"p" if body_level => paragraph = Some(String::new()),
                    b"tbl" => match table.as_mut() {
                        Some(t) => t.nesting += 1,
                        None if body_level => {
                            table = Some(TableBuilder {
                                nesting: 1,
                                ..Default::default()
                            })
                        }
                        None => {}
                    },
                    b"tr" => {
                        if let Some(t) = table.as_mut().filter(|t| t.nesting == 1) {
                            t.row = Some(Vec::new());
                        }
                    }
                    b"tc" => {
                        if let Some(t) = table.as_mut().filter(|t| t.nesting == 1 && t.row.is_some()) {
                            t.cell = Some(String::new());
                        }
                    }
                    b"t" => in_text = true,
                    _ => {}
                }
            }
            Event::End(e) => {
                let body_level = body_depth == Some(depth - 1);
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" if body_level => {
                        if let Some(text) = paragraph.take() {
                            let text = text.trim();
                            if !text.is_empty() {
                                out.paragraphs.push(text.to_string());
                            }
                        }
                    }
                    b"tc" => {
                        if let Some(t) = table.as_mut().filter(|t| t.nesting == 1) {
                            if let (Some(row), Some(cell)) = (t.row.as_mut(), t.cell.take()) {
                                row.push(cell.trim().to_string());
                            }
                        }
                    }
                    b"tr" => {
                        if let Some(t) = table.as_mut().filter(|t| t.nesting == 1) {
                            if let Some(row) = t.row.take().filter(|r| !r.is_empty()) {
                                t.rows.push(row);
                            }
                        }
                    }
                    b"tbl" => {
                        if let Some(t) = table.as_mut() {
                            t.nesting -= 1;
                            if t.nesting == 0 {
                                let rows = table.take().map(|t| t.rows).unwrap_or_default();
                                if !rows.is_empty() {
                                    out.tables.push(rows);
                                }
                            }
                        }
                    }
                    b"body" => body_depth = None,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(e) if in_text => {
                let text = e.unescape()?;
                if let Some(cell) = table.as_mut().and_then(|t| t.cell.as_mut()) {
                    cell.push_str(&text);
                } else if let Some(p) = paragraph.as_mut() {
                    p.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}
