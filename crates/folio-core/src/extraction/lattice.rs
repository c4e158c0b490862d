use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use lopdf::content::Content;
use lopdf::{Document, Object};

use crate::error::FolioError;
use crate::extraction::table::{PageSelector, PageTable, TableStrategy};
use crate::extraction::{PageBlocks, PdfBackend, Word};
use crate::model::Table;

/// Table detection from ruling lines drawn in the page content stream.
///
/// Stroked paths and rectangles are reduced to horizontal and vertical
/// rulings, connected rulings form a grid, and words are placed into the
/// grid cells by their centers.
pub struct LatticeStrategy {
    backend: Arc<dyn PdfBackend>,
    tolerance: f32,
}

impl LatticeStrategy {
    pub fn new(backend: Arc<dyn PdfBackend>, tolerance: f32) -> Self {
        LatticeStrategy { backend, tolerance }
    }
}

impl TableStrategy for LatticeStrategy {
    fn name(&self) -> &str {
        "lattice"
    }

    fn extract(&self, pdf: &Path, pages: PageSelector) -> Result<Vec<PageTable>, FolioError> {
        let document = Document::load(pdf)?;
        let blocks: HashMap<usize, PageBlocks> = self
            .backend
            .page_blocks(pdf)?
            .into_iter()
            .map(|p| (p.page_number, p))
            .collect();

        let mut out = Vec::new();
        for (number, page_id) in document.get_pages() {
            let page_number = number as usize;
            if !pages.includes(page_number) {
                continue;
            }
            let Some(page) = blocks.get(&page_number) else {
                continue;
            };
            let content = document.get_page_content(page_id)?;
            let rulings = collect_rulings(&Content::decode(&content)?, page.height, self.tolerance);
            let words: Vec<&Word> = page.words().collect();
            for rows in build_tables(&rulings, &words, self.tolerance) {
                out.push(PageTable { page_number, rows });
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ruling {
    /// y, x0, x1 in top-left page space.
    Horizontal(f32, f32, f32),
    /// x, y0, y1 in top-left page space.
    Vertical(f32, f32, f32),
}

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Option<Vec<f32>> {
    operands.iter().map(number).collect()
}

/// Walk the content stream and collect axis-aligned rulings from painted
/// paths. `page_height` flips PDF space (origin bottom-left) to page space.
fn collect_rulings(content: &Content, page_height: f32, tolerance: f32) -> Vec<Ruling> {
    let mut ctm = IDENTITY;
    let mut stack: Vec<Matrix> = Vec::new();
    let mut path: Vec<((f32, f32), (f32, f32))> = Vec::new();
    let mut current: Option<(f32, f32)> = None;
    let mut start: Option<(f32, f32)> = None;
    let mut rulings = Vec::new();

    for op in &content.operations {
        let args = numbers(&op.operands);
        match (op.operator.as_str(), args.as_deref()) {
            ("q", _) => stack.push(ctm),
            ("Q", _) => ctm = stack.pop().unwrap_or(IDENTITY),
            ("cm", Some([a, b, c, d, e, f])) => ctm = multiply(&[*a, *b, *c, *d, *e, *f], &ctm),
            ("m", Some([x, y])) => {
                let p = apply(&ctm, *x, *y);
                current = Some(p);
                start = Some(p);
            }
            ("l", Some([x, y])) => {
                let p = apply(&ctm, *x, *y);
                if let Some(from) = current {
                    path.push((from, p));
                }
                current = Some(p);
            }
            ("h", _) => {
                if let (Some(from), Some(to)) = (current, start) {
                    path.push((from, to));
                    current = Some(to);
                }
            }
            ("re", Some([x, y, w, h])) => {
                let corners = [
                    apply(&ctm, *x, *y),
                    apply(&ctm, x + w, *y),
                    apply(&ctm, x + w, y + h),
                    apply(&ctm, *x, y + h),
                ];
                for i in 0..4 {
                    path.push((corners[i], corners[(i + 1) % 4]));
                }
                current = Some(corners[0]);
                start = Some(corners[0]);
            }
            ("S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*", _) => {
                for (from, to) in path.drain(..) {
                    if let Some(r) = to_ruling(from, to, page_height, tolerance) {
                        rulings.push(r);
                    }
                }
                current = None;
                start = None;
            }
            ("n", _) => {
                path.clear();
                current = None;
                start = None;
            }
            _ => {}
        }
    }
    rulings
}

fn to_ruling(from: (f32, f32), to: (f32, f32), page_height: f32, tolerance: f32) -> Option<Ruling> {
    let (x0, y0) = (from.0, page_height - from.1);
    let (x1, y1) = (to.0, page_height - to.1);
    if (y0 - y1).abs() <= tolerance && (x0 - x1).abs() > tolerance {
        Some(Ruling::Horizontal((y0 + y1) / 2.0, x0.min(x1), x0.max(x1)))
    } else if (x0 - x1).abs() <= tolerance && (y0 - y1).abs() > tolerance {
        Some(Ruling::Vertical((x0 + x1) / 2.0, y0.min(y1), y0.max(y1)))
    } else {
        None
    }
}

fn intersects(h: &Ruling, v: &Ruling, tolerance: f32) -> bool {
    match (h, v) {
        (Ruling::Horizontal(y, x0, x1), Ruling::Vertical(x, y0, y1)) => {
            *x >= x0 - tolerance
                && *x <= x1 + tolerance
                && *y >= y0 - tolerance
                && *y <= y1 + tolerance
        }
        _ => false,
    }
}

fn find(parent: &mut [usize], i: usize) -> usize {
    let mut root = i;
    while parent[root] != root {
        root = parent[root];
    }
    let mut node = i;
    while parent[node] != root {
        let next = parent[node];
        parent[node] = root;
        node = next;
    }
    root
}

/// Group rulings into connected grids and fill each grid with words.
fn build_tables(rulings: &[Ruling], words: &[&Word], tolerance: f32) -> Vec<Table> {
    let mut parent: Vec<usize> = (0..rulings.len()).collect();
    for (i, a) in rulings.iter().enumerate() {
        for (j, b) in rulings.iter().enumerate().skip(i + 1) {
            if intersects(a, b, tolerance) || intersects(b, a, tolerance) {
                let (ra, rb) = (find(&mut parent, i), find(&mut parent, j));
                parent[ra] = rb;
            }
        }
    }

    let mut groups: Vec<(usize, Vec<Ruling>)> = Vec::new();
    for (i, r) in rulings.iter().enumerate() {
        let root = find(&mut parent, i);
        match groups.iter_mut().find(|(g, _)| *g == root) {
            Some((_, members)) => members.push(*r),
            None => groups.push((root, vec![*r])),
        }
    }

    let mut grids: Vec<(f32, f32, Table)> = groups
        .into_iter()
        .filter_map(|(_, members)| {
            let ys = distinct(
                members.iter().filter_map(|r| match r {
                    Ruling::Horizontal(y, _, _) => Some(*y),
                    _ => None,
                }),
                tolerance,
            );
            let xs = distinct(
                members.iter().filter_map(|r| match r {
                    Ruling::Vertical(x, _, _) => Some(*x),
                    _ => None,
                }),
                tolerance,
            );
            if ys.len() < 2 || xs.len() < 2 {
                return None;
            }
            Some((ys[0], xs[0], fill_grid(&ys, &xs, words)))
        })
        .collect();

    grids.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    grids.into_iter().map(|(_, _, t)| t).collect()
}

/// Sorted coordinates with values closer than `tolerance` merged.
fn distinct(values: impl Iterator<Item = f32>, tolerance: f32) -> Vec<f32> {
    let mut sorted: Vec<f32> = values.collect();
    sorted.sort_by(f32::total_cmp);
    let mut out: Vec<f32> = Vec::new();
    for v in sorted {
        match out.last() {
            Some(last) if v - last <= tolerance => {}
            _ => out.push(v),
        }
    }
    out
}

fn cell_index(edges: &[f32], v: f32) -> Option<usize> {
    edges.windows(2).position(|w| v >= w[0] && v < w[1])
}

fn fill_grid(ys: &[f32], xs: &[f32], words: &[&Word]) -> Table {
    let mut cells: Vec<Vec<Vec<&Word>>> = vec![vec![Vec::new(); xs.len() - 1]; ys.len() - 1];
    for &word in words {
        let (cx, cy) = word.bbox.center();
        if let (Some(r), Some(c)) = (cell_index(ys, cy), cell_index(xs, cx)) {
            cells[r][c].push(word);
        }
    }

    cells
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect()
}

/// Words in reading order; a new visual line starts a new text line.
fn cell_text(mut words: Vec<&Word>) -> String {
    words.sort_by(|a, b| {
        a.bbox
            .center()
            .1
            .total_cmp(&b.bbox.center().1)
            .then(a.bbox.x_min.total_cmp(&b.bbox.x_min))
    });
    let mut text = String::new();
    let mut last_cy: Option<f32> = None;
    for word in words {
        let (_, cy) = word.bbox.center();
        let token = word.bbox.height() / 2.0;
        match last_cy {
            Some(prev) if (cy - prev).abs() > token => text.push('\n'),
            Some(_) => text.push(' '),
            None => {}
        }
        text.push_str(word.text.trim());
        last_cy = Some(cy);
    }
    text
}
