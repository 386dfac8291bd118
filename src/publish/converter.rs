//! Notebook to standalone HTML page conversion.

use super::notebook::{bundle_text, Cell, MimeBundle, Notebook, NotebookParseError, Output};
use crate::error::ConversionError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Subdirectory of the site that receives extracted images.
pub const PLOTS_SUBDIR: &str = "plots";

/// One entry of the fixed navigation block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

impl NavLink {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }
}

pub fn default_title() -> String {
    "Website Carbon API - EDA Analysis".to_string()
}

pub fn default_nav_links() -> Vec<NavLink> {
    vec![NavLink::new("← Back to Home", "index.html")]
}

/// Page-level presentation settings.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    pub nav_links: Vec<NavLink>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: default_title(),
            nav_links: default_nav_links(),
        }
    }
}

/// An image pulled out of a cell output, waiting to be written.
#[derive(Debug)]
struct ExtractedImage {
    file_name: String,
    bytes: Vec<u8>,
}

/// Convert a notebook into `out_dir/<stem>.html`, extracting images into
/// `out_dir/plots/`.
///
/// Nothing is written unless the whole notebook parses and every image
/// payload decodes.
pub fn convert_notebook_to_page(
    notebook_path: &Path,
    out_dir: &Path,
    options: &PageOptions,
) -> Result<PathBuf, ConversionError> {
    if !notebook_path.exists() {
        return Err(ConversionError::Missing(notebook_path.to_path_buf()));
    }

    info!("Reading notebook: {}", notebook_path.display());
    let raw = fs::read_to_string(notebook_path).map_err(|source| ConversionError::Io {
        path: notebook_path.to_path_buf(),
        source,
    })?;

    let notebook = parse_notebook(&raw, notebook_path)?;
    debug!(
        "Parsed notebook v{}.{} with {} cells",
        notebook.nbformat,
        notebook.nbformat_minor,
        notebook.cells.len()
    );

    let mut images = Vec::new();
    let body = render_cells(&notebook, &mut images)?;
    let page = render_page(&body, options);

    let stem = notebook_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("notebook");
    let output_path = out_dir.join(format!("{}.html", stem));

    write_site(out_dir, &output_path, &page, &images)?;

    info!(
        "Page written: {} ({} bytes, {} images)",
        output_path.display(),
        page.len(),
        images.len()
    );
    Ok(output_path)
}

fn parse_notebook(raw: &str, path: &Path) -> Result<Notebook, ConversionError> {
    let malformed = |source| ConversionError::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let value: Value = serde_json::from_str(raw).map_err(malformed)?;
    Notebook::from_value(value).map_err(|e| match e {
        NotebookParseError::Version(v) => ConversionError::UnsupportedVersion(v),
        NotebookParseError::Schema(source) => malformed(source),
    })
}

fn write_site(
    out_dir: &Path,
    output_path: &Path,
    page: &str,
    images: &[ExtractedImage],
) -> Result<(), ConversionError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ConversionError::Io { path, source }
    };

    fs::create_dir_all(out_dir).map_err(io_err(out_dir))?;

    if !images.is_empty() {
        let plots_dir = out_dir.join(PLOTS_SUBDIR);
        fs::create_dir_all(&plots_dir).map_err(io_err(&plots_dir))?;

        for image in images {
            let path = plots_dir.join(&image.file_name);
            fs::write(&path, &image.bytes).map_err(io_err(&path))?;
            debug!("Extracted image: {}", path.display());
        }
    }

    fs::write(output_path, page).map_err(io_err(output_path))
}

fn render_cells(
    notebook: &Notebook,
    images: &mut Vec<ExtractedImage>,
) -> Result<String, ConversionError> {
    let mut body = String::new();

    for (index, cell) in notebook.cells.iter().enumerate() {
        match cell {
            Cell::Markdown { source } => {
                body.push_str("<div class=\"cell markdown\">\n");
                body.push_str(&markdown_to_html(&source.text()));
                body.push_str("</div>\n");
            }
            Cell::Code {
                source,
                execution_count,
                outputs,
            } => {
                body.push_str(&render_code_cell(
                    index,
                    &source.text(),
                    *execution_count,
                    outputs,
                    images,
                )?);
            }
            Cell::Raw { source, metadata } => {
                // Raw cells pass through only when marked as HTML.
                if raw_is_html(metadata) {
                    body.push_str(&source.text());
                    body.push('\n');
                }
            }
        }
    }

    Ok(body)
}

fn raw_is_html(metadata: &Value) -> bool {
    ["format", "raw_mimetype"].iter().any(|key| {
        metadata
            .get(*key)
            .and_then(Value::as_str)
            .map(|v| v == "text/html")
            .unwrap_or(false)
    })
}

fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(text, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn render_code_cell(
    cell: usize,
    source: &str,
    execution_count: Option<u32>,
    outputs: &[Output],
    images: &mut Vec<ExtractedImage>,
) -> Result<String, ConversionError> {
    let prompt = execution_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| " ".to_string());

    let mut html = String::new();
    html.push_str("<div class=\"cell code\">\n");
    html.push_str("<div class=\"input\">\n");
    html.push_str(&format!("<div class=\"prompt\">In [{}]:</div>\n", prompt));
    html.push_str(&format!("<pre><code>{}</code></pre>\n", html_escape(source)));
    html.push_str("</div>\n");

    if !outputs.is_empty() {
        html.push_str("<div class=\"output\">\n");
        for (index, output) in outputs.iter().enumerate() {
            html.push_str("<div class=\"output_area\"><div class=\"output_subarea\">\n");
            html.push_str(&render_output(cell, index, output, images)?);
            html.push_str("</div></div>\n");
        }
        html.push_str("</div>\n");
    }

    html.push_str("</div>\n");
    Ok(html)
}

fn render_output(
    cell: usize,
    index: usize,
    output: &Output,
    images: &mut Vec<ExtractedImage>,
) -> Result<String, ConversionError> {
    match output {
        Output::Stream { name, text } => Ok(format!(
            "<pre class=\"stream {}\">{}</pre>\n",
            html_escape(name),
            html_escape(&strip_ansi(&text.text()))
        )),
        Output::DisplayData { data } => render_bundle(cell, index, data, images),
        Output::ExecuteResult {
            data,
            execution_count,
        } => {
            let body = render_bundle(cell, index, data, images)?;
            Ok(match execution_count {
                Some(n) => format!("<div class=\"prompt\">Out [{}]:</div>\n{}", n, body),
                None => body,
            })
        }
        Output::Error {
            ename,
            evalue,
            traceback,
        } => {
            let text = if traceback.is_empty() {
                format!("{}: {}", ename, evalue)
            } else {
                traceback.join("\n")
            };
            Ok(format!(
                "<pre class=\"error\">{}</pre>\n",
                html_escape(&strip_ansi(&text))
            ))
        }
    }
}

fn render_bundle(
    cell: usize,
    index: usize,
    data: &MimeBundle,
    images: &mut Vec<ExtractedImage>,
) -> Result<String, ConversionError> {
    if let Some(markup) = bundle_text(data, "text/html") {
        return Ok(format!("{}\n", markup));
    }

    if let Some(svg) = bundle_text(data, "image/svg+xml") {
        let file_name = image_name(cell, index, "svg");
        images.push(ExtractedImage {
            file_name: file_name.clone(),
            bytes: svg.into_bytes(),
        });
        return Ok(img_tag(&file_name));
    }

    for (mime, ext) in [("image/png", "png"), ("image/jpeg", "jpg")] {
        if let Some(payload) = bundle_text(data, mime) {
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact.as_bytes())
                .map_err(|_| ConversionError::BadImage {
                    cell,
                    output: index,
                    mime: mime.to_string(),
                })?;

            let file_name = image_name(cell, index, ext);
            images.push(ExtractedImage {
                file_name: file_name.clone(),
                bytes,
            });
            return Ok(img_tag(&file_name));
        }
    }

    if let Some(markdown) = bundle_text(data, "text/markdown") {
        return Ok(markdown_to_html(&markdown));
    }

    Ok(bundle_text(data, "text/plain")
        .map(|text| format!("<pre>{}</pre>\n", html_escape(&strip_ansi(&text))))
        .unwrap_or_default())
}

fn image_name(cell: usize, output: usize, ext: &str) -> String {
    format!("output_{}_{}.{}", cell, output, ext)
}

fn img_tag(file_name: &str) -> String {
    format!(
        "<img src=\"{}/{}\" alt=\"{}\">\n",
        PLOTS_SUBDIR,
        html_escape(file_name),
        html_escape(file_name)
    )
}

/// Remove ANSI CSI sequences such as color codes from terminal output.
fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            // Parameters run until a final byte in '@'..='~'.
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        }
    }

    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_nav(links: &[NavLink]) -> String {
    if links.is_empty() {
        return String::new();
    }

    let anchors: Vec<String> = links
        .iter()
        .map(|link| {
            format!(
                "<a href=\"{}\">{}</a>",
                html_escape(&link.href),
                html_escape(&link.label)
            )
        })
        .collect();

    format!(
        "    <div class=\"nav-links\">\n        {}\n    </div>\n",
        anchors.join("\n        ")
    )
}

fn render_page(body: &str, options: &PageOptions) -> String {
    let mut page = String::new();

    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    page.push_str("    <meta charset=\"utf-8\">\n");
    page.push_str("    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    page.push_str(&format!("    <title>{}</title>\n", html_escape(&options.title)));
    page.push_str(PAGE_STYLE);
    page.push_str("</head>\n<body>\n");
    page.push_str(&render_nav(&options.nav_links));
    page.push_str("    <div class=\"container\">\n");
    page.push_str(body);
    page.push_str("    </div>\n</body>\n</html>\n");

    page
}

const PAGE_STYLE: &str = r#"    <style>
    body {
        font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
        line-height: 1.6;
        padding: 20px;
        max-width: 1200px;
        margin: 0 auto;
        background-color: #f8f9fa;
    }
    .container {
        background: white;
        border-radius: 8px;
        padding: 30px;
        box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        margin-bottom: 20px;
    }
    h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; }
    h2 { color: #34495e; margin-top: 30px; }
    h3 { color: #7f8c8d; }
    code {
        background-color: #f1f2f6;
        padding: 2px 6px;
        border-radius: 3px;
        font-family: 'Courier New', monospace;
    }
    pre {
        background-color: #f8f9fa;
        border: 1px solid #e9ecef;
        border-radius: 5px;
        padding: 15px;
        overflow-x: auto;
    }
    pre.error { border-color: #f5c6cb; background-color: #fdf2f2; }
    .prompt { color: #303f9f; font-family: 'Courier New', monospace; font-size: 0.9em; }
    .output_subarea { margin: 10px 0; }
    .output_area img {
        max-width: 100%;
        height: auto;
        border-radius: 5px;
        box-shadow: 0 2px 5px rgba(0,0,0,0.1);
    }
    .cell { margin: 20px 0; }
    .input { margin-bottom: 10px; }
    .output { margin-top: 10px; }
    .markdown { color: #2c3e50; }
    .markdown h1, .markdown h2, .markdown h3 { margin-top: 25px; }
    .markdown p { margin: 10px 0; }
    .markdown ul, .markdown ol { margin: 10px 0; padding-left: 25px; }
    .markdown code { color: #e74c3c; }
    .nav-links {
        position: fixed;
        top: 20px;
        right: 20px;
        background: #3498db;
        color: white;
        padding: 10px;
        border-radius: 5px;
        z-index: 1000;
    }
    .nav-links a { color: white; text-decoration: none; margin: 0 5px; font-weight: bold; }
    .nav-links a:hover { text-decoration: underline; }
    </style>
"#;
