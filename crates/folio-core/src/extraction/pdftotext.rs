use crate::error::FolioError;
use crate::extraction::{BBox, PageBlocks, PdfBackend, TextBlock, TextLine, Word};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// PDF backend built on poppler-utils.
///
/// Uses `pdftotext -bbox-layout` for positioned text blocks and `pdftoppm`
/// for rasterization.
pub struct PopplerBackend;

impl PopplerBackend {
    pub fn new() -> Self {
        PopplerBackend
    }
}

impl Default for PopplerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBackend for PopplerBackend {
    fn page_blocks(&self, pdf: &Path) -> Result<Vec<PageBlocks>, FolioError> {
        let output = run_tool(
            "pdftotext",
            Command::new("pdftotext")
                .arg("-bbox-layout")
                .arg(pdf)
                .arg("-"),
        )?;
        let xml = String::from_utf8_lossy(&output.stdout);
        Ok(parse_bbox_layout(&xml))
    }

    fn render_page(
        &self,
        pdf: &Path,
        page_number: usize,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<PathBuf, FolioError> {
        let prefix = out_dir.join(format!("page_{page_number}"));
        let page = page_number.to_string();
        run_tool(
            "pdftoppm",
            Command::new("pdftoppm")
                .arg("-r")
                .arg(dpi.to_string())
                .arg("-f")
                .arg(&page)
                .arg("-l")
                .arg(&page)
                .arg("-png")
                .arg("-singlefile")
                .arg(pdf)
                .arg(&prefix),
        )?;
        let image = prefix.with_extension("png");
        if !image.exists() {
            return Err(FolioError::parse(
                pdf,
                format!("pdftoppm produced no image for page {page_number}"),
            ));
        }
        Ok(image)
    }

    fn backend_name(&self) -> &str {
        "poppler"
    }
}

/// Run an external tool, mapping a missing binary and a non-zero exit to
/// dedicated errors.
pub(crate) fn run_tool(tool: &str, cmd: &mut Command) -> Result<Output, FolioError> {
    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FolioError::ToolNotFound { tool: tool.into() }
        } else {
            FolioError::Io(e)
        }
    })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(FolioError::ToolFailed {
            tool: tool.into(),
            code,
            stderr,
        });
    }
    Ok(output)
}

/// Parse `pdftotext -bbox-layout` XHTML into per-page blocks.
///
/// pdftotext writes one tag per line, so a line-oriented scan is enough.
fn parse_bbox_layout(xml: &str) -> Vec<PageBlocks> {
    let mut pages: Vec<PageBlocks> = Vec::new();
    let mut block: Option<TextBlock> = None;
    let mut line: Option<TextLine> = None;

    for raw in xml.lines() {
        let tag = raw.trim();

        if tag.starts_with("<page ") || tag == "<page>" {
            pages.push(PageBlocks {
                page_number: pages.len() + 1,
                width: parse_attr_f32(tag, "width").unwrap_or(0.0),
                height: parse_attr_f32(tag, "height").unwrap_or(0.0),
                blocks: Vec::new(),
            });
            continue;
        }

        if tag.starts_with("<block ") {
            block = parse_bbox(tag).map(|bbox| TextBlock {
                bbox,
                lines: Vec::new(),
            });
            continue;
        }

        if tag.starts_with("<line ") {
            line = parse_bbox(tag).map(|bbox| TextLine {
                bbox,
                words: Vec::new(),
            });
            continue;
        }

        if tag.starts_with("<word ") {
            if let (Some(l), Some(bbox), Some(text)) =
                (line.as_mut(), parse_bbox(tag), parse_word_text(tag))
            {
                l.words.push(Word {
                    text: decode_xml_entities(&text),
                    bbox,
                });
            }
            continue;
        }

        if tag.starts_with("</line>") {
            if let (Some(b), Some(l)) = (block.as_mut(), line.take()) {
                b.lines.push(l);
            }
            continue;
        }

        if tag.starts_with("</block>") {
            if let (Some(p), Some(b)) = (pages.last_mut(), block.take()) {
                p.blocks.push(b);
            }
        }
    }

    pages
}

fn parse_attr_f32(tag: &str, name: &str) -> Option<f32> {
    parse_attr(tag, name)?.parse().ok()
}

fn parse_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let rest = &tag[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn parse_bbox(tag: &str) -> Option<BBox> {
    Some(BBox {
        x_min: parse_attr_f32(tag, "xMin")?,
        y_min: parse_attr_f32(tag, "yMin")?,
        x_max: parse_attr_f32(tag, "xMax")?,
        y_max: parse_attr_f32(tag, "yMax")?,
    })
}

fn parse_word_text(word_tag: &str) -> Option<String> {
    let start = word_tag.find('>')? + 1;
    let end = word_tag.rfind("</word>")?;
    Some(word_tag[start..end].to_string())
}

fn decode_xml_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
