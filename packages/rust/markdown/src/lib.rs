//! Wiki DOM → Markdown conversion and link rewriting.
//!
//! - [`convert_page`] / [`convert_root`]: the Markup Converter
//! - [`rewrite_links`] / [`relative_reference`]: the Path Resolver
//! - [`scan_links`]: the link grammar shared with the validator
//! - [`render_document`]: front matter + body, as persisted on disk

mod cleanup;
mod elements;
mod inline;
mod links;
mod paths;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use cleanup::{collapse_blank_lines, collapse_whitespace, table_cell};
use inline::render_inline;

pub use elements::{ElementKind, classify, clean_heading_text, is_chrome, visible_text};
pub use links::{LinkSpan, escape_link_text, is_fence_line, scan_links};
pub use paths::{relative_reference, rewrite_links, split_anchor};

/// `pre` classes that name a fence language.
const KNOWN_LANGUAGES: &[&str] = &["bash", "shell", "sh", "python"];

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1#firstHeading").expect("valid selector"));

static CONTENT_SELS: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        Selector::parse("div.mw-parser-output").expect("valid selector"),
        Selector::parse("#mw-content-text").expect("valid selector"),
    ]
});

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid selector"));

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options for the DOM → Markdown conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Href prefix of internal article links; such links are kept as
    /// `[text](href)` for the rewriter.
    pub title_prefix: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            title_prefix: "/title/".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// The page heading (`h1#firstHeading`), if present and non-empty.
pub fn page_title(doc: &Html) -> Option<String> {
    let heading = doc.select(&TITLE_SEL).next()?;
    let title = collapse_whitespace(&visible_text(heading));
    (!title.is_empty()).then_some(title)
}

/// The article body: `div.mw-parser-output`, else `#mw-content-text`.
pub fn content_root(doc: &Html) -> Option<ElementRef<'_>> {
    CONTENT_SELS
        .iter()
        .find_map(|selector| doc.select(selector).next())
}

/// Convert a whole wiki page. Returns the empty string when nothing could be
/// extracted.
#[instrument(skip_all)]
pub fn convert_page(doc: &Html, opts: &ConvertOptions) -> String {
    let Some(root) = content_root(doc) else {
        debug!("no content root found");
        return String::new();
    };
    convert_root(page_title(doc).as_deref(), root, opts)
}

/// Convert the direct children of `root`, prefixed by `# title` when given.
///
/// Returns the empty string when no child yields a block, even if a title
/// was given.
pub fn convert_root(title: Option<&str>, root: ElementRef<'_>, opts: &ConvertOptions) -> String {
    let mut blocks = Vec::new();
    for child in root.children().filter_map(ElementRef::wrap) {
        convert_block(child, opts, &mut blocks);
    }

    if blocks.is_empty() {
        return String::new();
    }

    let mut parts = Vec::with_capacity(blocks.len() + 1);
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        parts.push(format!("# {title}"));
    }
    parts.extend(blocks);

    debug!(blocks = parts.len(), "page converted");
    collapse_blank_lines(&parts.join("\n\n")).trim().to_string()
}

fn convert_block(el: ElementRef<'_>, opts: &ConvertOptions, blocks: &mut Vec<String>) {
    let block = match classify(el) {
        ElementKind::Filtered | ElementKind::Unknown => None,
        ElementKind::Heading(level) => render_heading(el, level),
        ElementKind::Paragraph => render_paragraph(el, opts),
        ElementKind::List { ordered } => render_list(el, ordered, opts),
        ElementKind::Preformatted => render_preformatted(el),
        ElementKind::Table => render_table(el),
        ElementKind::Fallback => {
            // One level deep, paragraphs only.
            for child in el.children().filter_map(ElementRef::wrap) {
                if classify(child) == ElementKind::Paragraph {
                    blocks.extend(render_paragraph(child, opts));
                }
            }
            None
        }
    };
    blocks.extend(block);
}

fn render_heading(el: ElementRef<'_>, level: u8) -> Option<String> {
    let raw = collapse_whitespace(&visible_text(el));
    let text = clean_heading_text(&raw);
    if text.is_empty() {
        return None;
    }
    Some(format!("{} {text}", "#".repeat(usize::from(level))))
}

fn render_paragraph(el: ElementRef<'_>, opts: &ConvertOptions) -> Option<String> {
    let text = render_inline(el, opts);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn render_list(el: ElementRef<'_>, ordered: bool, opts: &ConvertOptions) -> Option<String> {
    let mut lines = Vec::new();
    push_list_items(el, ordered, "", true, opts, &mut lines);
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn push_list_items(
    list: ElementRef<'_>,
    ordered: bool,
    indent: &str,
    descend: bool,
    opts: &ConvertOptions,
    lines: &mut Vec<String>,
) {
    let mut index = 0;
    let items = list
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|item| item.value().name() == "li" && !is_chrome(*item));

    for item in items {
        let text = collapse_whitespace(&render_inline(item, opts));
        if !text.is_empty() {
            index += 1;
            let line = if ordered {
                format!("{indent}{index}. {text}")
            } else {
                format!("{indent}* {text}")
            };
            lines.push(line);
        }

        if !descend {
            continue;
        }
        for nested in item.children().filter_map(ElementRef::wrap) {
            if let ElementKind::List { ordered } = classify(nested) {
                push_list_items(nested, ordered, "  ", false, opts, lines);
            }
        }
    }
}

fn render_preformatted(el: ElementRef<'_>) -> Option<String> {
    let text = visible_text(el);
    let code = text.trim_start_matches(['\n', '\r']).trim_end();
    if code.trim().is_empty() {
        return None;
    }

    let lang = el
        .value()
        .classes()
        .map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .unwrap_or(class)
        })
        .find(|class| KNOWN_LANGUAGES.contains(class))
        .unwrap_or("");

    Some(format!("```{lang}\n{code}\n```"))
}

fn render_table(el: ElementRef<'_>) -> Option<String> {
    // Rows of this table only, not of tables nested in its cells.
    let mut rows = el.select(&ROW_SEL).filter(|row| {
        row.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| ancestor.value().name() == "table")
            .is_some_and(|table| table.id() == el.id())
    });

    let first = rows.next()?;
    let mut header = row_cells(first, "th");
    if header.is_empty() {
        header = row_cells(first, "td");
    }

    let mut lines = Vec::new();
    if !header.is_empty() {
        lines.push(format!("| {} |", header.join(" | ")));
        lines.push(format!("|{}", " --- |".repeat(header.len())));
    }

    for row in rows {
        let cells = row_cells(row, "td");
        if !cells.is_empty() {
            lines.push(format!("| {} |", cells.join(" | ")));
        }
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn row_cells(row: ElementRef<'_>, cell_name: &str) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == cell_name)
        .map(|cell| table_cell(&visible_text(cell)))
        .collect()
}

// ---------------------------------------------------------------------------
// Persisted document
// ---------------------------------------------------------------------------

/// Front matter + blank line + body, terminated by a single newline.
pub fn render_document(title: &str, url: &str, date_scraped: &str, body: &str) -> String {
    let mut doc = String::from("---\n");
    doc.push_str(&format!("title: \"{}\"\n", escape_yaml_string(title)));
    doc.push_str(&format!("url: \"{}\"\n", escape_yaml_string(url)));
    doc.push_str(&format!("date_scraped: \"{date_scraped}\"\n"));
    doc.push_str("---\n\n");
    doc.push_str(body.trim_end_matches('\n'));
    doc.push('\n');
    doc
}

/// Escape special characters in a YAML string value.
fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
