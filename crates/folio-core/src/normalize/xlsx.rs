use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::classify::extension_of;
use crate::error::FolioError;
use crate::model::{Page, Row, Table};
use crate::normalize::numfmt::{format_integer, format_number, plain_number};

/// Number format code per absolute (row, col) of one sheet.
pub type CellFormats = HashMap<(u32, u32), String>;

/// Normalize a workbook into a single page with one table per non-empty
/// sheet.
pub fn extract_pages(path: &Path) -> Result<Vec<Page>, FolioError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| FolioError::Spreadsheet(e.to_string()))?;
    let formats = load_formats(path);

    let mut tables = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| FolioError::Spreadsheet(format!("sheet '{name}': {e}")))?;
        let table = sheet_table(&range, formats.as_ref().and_then(|f| f.for_sheet(&name)));
        if !table.is_empty() {
            tables.push(table);
        }
    }

    let text = format!("Excel file with {} sheets", tables.len());
    Ok(vec![Page::new(1, text, tables)])
}

/// The first worksheet's used range as one table, header row first.
pub fn first_sheet_table(path: &Path) -> Result<Option<Table>, FolioError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| FolioError::Spreadsheet(e.to_string()))?;
    let Some(name) = workbook.sheet_names().into_iter().next() else {
        return Ok(None);
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| FolioError::Spreadsheet(format!("sheet '{name}': {e}")))?;
    let table = sheet_table(&range, None);
    Ok((!table.is_empty()).then_some(table))
}

fn load_formats(path: &Path) -> Option<NumberFormats> {
    if extension_of(path) != ".xlsx" {
        return None;
    }
    match NumberFormats::load(path) {
        Ok(formats) => Some(formats),
        Err(e) => {
            debug!(file = %path.display(), "number formats unavailable: {e}");
            None
        }
    }
}

/// Rows of display strings. Columns left of the used range are kept as
/// empty cells; rows with no content are skipped.
pub fn sheet_table(range: &Range<Data>, formats: Option<&CellFormats>) -> Table {
    let Some((row0, col0)) = range.start() else {
        return Vec::new();
    };

    range
        .rows()
        .enumerate()
        .filter_map(|(i, cells)| {
            let r = row0 + i as u32;
            let mut row: Row = vec![String::new(); col0 as usize];
            row.extend(cells.iter().enumerate().map(|(j, cell)| {
                let fmt = formats
                    .and_then(|f| f.get(&(r, col0 + j as u32)))
                    .map(String::as_str);
                cell_display(cell, fmt)
            }));
            row.iter().any(|c| !c.is_empty()).then_some(row)
        })
        .collect()
}

/// Display string for one cell. Numbers honour their format code.
pub fn cell_display(cell: &Data, format: Option<&str>) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => format_number(*f, format),
        Data::Int(i) => format_integer(*i, format),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| plain_number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

/// Number format codes of an `.xlsx` workbook, read from `xl/styles.xml`
/// and the `s` (style index) attribute of each sheet cell.
#[derive(Debug, Default)]
pub struct NumberFormats {
    sheets: HashMap<String, CellFormats>,
}

impl NumberFormats {
    pub fn load(path: &Path) -> Result<Self, FolioError> {
        let mut archive = zip::ZipArchive::new(File::open(path)?)?;

        let Some(styles) = read_entry(&mut archive, "xl/styles.xml")? else {
            return Ok(Self::default());
        };
        let style_formats = parse_styles(&styles)?;

        let workbook = read_entry(&mut archive, "xl/workbook.xml")?
            .ok_or_else(|| FolioError::parse(path, "missing xl/workbook.xml"))?;
        let rels = read_entry(&mut archive, "xl/_rels/workbook.xml.rels")?
            .ok_or_else(|| FolioError::parse(path, "missing workbook relationships"))?;
        let targets = parse_relationships(&rels)?;

        let mut sheets = HashMap::new();
        for (name, rel_id) in parse_sheets(&workbook)? {
            let Some(target) = targets.get(&rel_id) else {
                continue;
            };
            let entry = resolve_target(target);
            if let Some(xml) = read_entry(&mut archive, &entry)? {
                sheets.insert(name, parse_cell_styles(&xml, &style_formats)?);
            }
        }
        Ok(NumberFormats { sheets })
    }

    pub fn for_sheet(&self, name: &str) -> Option<&CellFormats> {
        self.sheets.get(name)
    }
}

fn read_entry(
    archive: &mut zip::ZipArchive<File>,
    name: &str,
) -> Result<Option<String>, FolioError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>, FolioError> {
    for a in e.attributes() {
        let a = a?;
        if a.key.as_ref() == name {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Format code per cell style index (`cellXfs` order).
fn parse_styles(xml: &str) -> Result<Vec<Option<String>>, FolioError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut custom: HashMap<u32, String> = HashMap::new();
    let mut xf_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    if let (Some(id), Some(code)) = (attr(&e, b"numFmtId")?, attr(&e, b"formatCode")?) {
                        if let Ok(id) = id.parse() {
                            custom.insert(id, code);
                        }
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let id = attr(&e, b"numFmtId")?
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                    xf_ids.push(id);
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(xf_ids
        .into_iter()
        .map(|id| {
            custom
                .get(&id)
                .cloned()
                .or_else(|| builtin_format(id).map(str::to_string))
        })
        .collect())
}

/// (sheet name, relationship id) in workbook order.
fn parse_sheets(xml: &str) -> Result<Vec<(String, String)>, FolioError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name")?;
                let mut rel_id = None;
                for a in e.attributes() {
                    let a = a?;
                    if a.key.local_name().as_ref() == b"id" && a.key.prefix().is_some() {
                        rel_id = Some(a.unescape_value()?.into_owned());
                    }
                }
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, FolioError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Format code for every styled cell that has a non-General format.
///
/// `r` is optional on both `<row>` and `<c>`; without it the position
/// follows the previous row or cell.
fn parse_cell_styles(xml: &str, styles: &[Option<String>]) -> Result<CellFormats, FolioError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut formats = CellFormats::new();
    let mut next_row: u32 = 0;
    let mut row: u32 = 0;
    let mut next_col: u32 = 0;
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                row = attr(&e, b"r")?
                    .and_then(|r| r.parse::<u32>().ok())
                    .and_then(|r| r.checked_sub(1))
                    .unwrap_or(next_row);
                next_row = row + 1;
                next_col = 0;
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let pos = attr(&e, b"r")?
                    .and_then(|r| parse_cell_ref(&r))
                    .unwrap_or((row, next_col));
                next_col = pos.1 + 1;

                let code = attr(&e, b"s")?
                    .and_then(|s| s.parse::<usize>().ok())
                    .and_then(|s| styles.get(s))
                    .and_then(|c| c.as_deref());
                if let Some(code) = code {
                    if !code.eq_ignore_ascii_case("general") {
                        formats.insert(pos, code.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(formats)
}

/// `"B3"` -> `(2, 1)`, zero-based (row, col).
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

/// Built-in number formats (ECMA-376 Part 1, 18.8.30).
fn builtin_format(id: u32) -> Option<&'static str> {
    Some(match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_refs() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("B3"), Some((2, 1)));
        assert_eq!(parse_cell_ref("AA10"), Some((9, 26)));
        assert_eq!(parse_cell_ref("10"), None);
        assert_eq!(parse_cell_ref("A0"), None);
    }

    #[test]
    fn styles_resolve_custom_and_builtin_codes() {
        let xml = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="0.00 &quot;Cr&quot;"/></numFmts>
  <cellStyleXfs count="1"><xf numFmtId="0"/></cellStyleXfs>
  <cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164" applyNumberFormat="1"/><xf numFmtId="4"/></cellXfs>
</styleSheet>"#;
        let styles = parse_styles(xml).unwrap();
        assert_eq!(
            styles,
            vec![
                Some("General".to_string()),
                Some("0.00 \"Cr\"".to_string()),
                Some("#,##0.00".to_string()),
            ]
        );
    }

    #[test]
    fn sheet_cells_map_to_codes_skipping_general() {
        let styles = vec![Some("General".to_string()), Some("0.00 \"Dr\"".to_string())];
        let xml = r#"<worksheet><sheetData>
  <row r="1"><c r="A1" s="0" t="s"><v>0</v></c><c r="B1" s="1"><v>12.5</v></c></row>
  <row r="2"><c r="B2"><v>3</v></c></row>
</sheetData></worksheet>"#;
        let formats = parse_cell_styles(xml, &styles).unwrap();
        assert_eq!(formats.len(), 1);
        assert_eq!(formats.get(&(0, 1)).map(String::as_str), Some("0.00 \"Dr\""));
    }

    #[test]
    fn cells_without_references_follow_their_neighbours() {
        let styles = vec![Some("General".to_string()), Some("0.00 \"Cr\"".to_string())];
        let xml = r#"<worksheet><sheetData>
  <row r="2"><c r="B2"><v>1</v></c><c s="1"><v>12.5</v></c></row>
  <row><c s="1"><v>3</v></c></row>
</sheetData></worksheet>"#;
        let formats = parse_cell_styles(xml, &styles).unwrap();
        assert_eq!(formats.get(&(1, 2)).map(String::as_str), Some("0.00 \"Cr\""));
        assert_eq!(formats.get(&(2, 0)).map(String::as_str), Some("0.00 \"Cr\""));
        assert_eq!(formats.len(), 2);
    }

    #[test]
    fn workbook_sheets_and_relationships() {
        let workbook = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Challans" sheetId="1" r:id="rId1"/><sheet name="Summary" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;
        assert_eq!(
            parse_sheets(workbook).unwrap(),
            vec![
                ("Challans".to_string(), "rId1".to_string()),
                ("Summary".to_string(), "rId2".to_string()),
            ]
        );

        let rels = r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Target="/xl/worksheets/sheet2.xml"/></Relationships>"#;
        let targets = parse_relationships(rels).unwrap();
        assert_eq!(resolve_target(&targets["rId1"]), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target(&targets["rId2"]), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn cell_display_by_type() {
        assert_eq!(cell_display(&Data::Empty, None), "");
        assert_eq!(cell_display(&Data::String("PAN".into()), Some("0.00")), "PAN");
        assert_eq!(cell_display(&Data::Float(1234.5), Some("0.00 \"Cr\"")), "1234.50 Cr");
        assert_eq!(cell_display(&Data::Float(7.0), Some("General")), "7");
        assert_eq!(cell_display(&Data::Int(7), None), "7");
        assert_eq!(cell_display(&Data::Bool(true), None), "True");
    }

    #[test]
    fn sheet_table_skips_empty_rows_and_pads_leading_columns() {
        let mut range: Range<Data> = Range::new((1, 1), (3, 2));
        range.set_value((1, 1), Data::String("Section".into()));
        range.set_value((1, 2), Data::String("Amount".into()));
        range.set_value((3, 1), Data::String("194C".into()));
        range.set_value((3, 2), Data::Float(1200.0));

        let mut formats = CellFormats::new();
        formats.insert((3, 2), "0.00".into());

        let table = sheet_table(&range, Some(&formats));
        assert_eq!(
            table,
            vec![
                vec!["".to_string(), "Section".to_string(), "Amount".to_string()],
                vec!["".to_string(), "194C".to_string(), "1200.00".to_string()],
            ]
        );
    }
}
