//! Element classification for the converter.
//!
//! Every child of the content root is classified exactly once into a closed
//! set of kinds; the converter then dispatches on the kind.

use scraper::ElementRef;
use scraper::node::Node;

/// Classes MediaWiki puts on page chrome.
const CHROME_CLASSES: &[&str] = &[
    "mw-jump-link",
    "mw-editsection",
    "mw-editsection-bracket",
    "vector-toc",
    "toc",
    "mw-indicators",
    "catlinks",
    "printfooter",
    "noprint",
    "mw-empty-elt",
];

/// Element ids of page chrome.
const CHROME_IDS: &[&str] = &[
    "mw-navigation",
    "mw-head",
    "mw-panel",
    "siteNotice",
    "archnavbar",
    "footer",
    "mw-page-tools",
    "mw-site-navigation",
    "toc",
    "catlinks",
];

/// Editor affordance MediaWiki appends to section headings.
const EDIT_MARKER: &str = "[edit]";

/// How a block-level element is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Navigation, edit links, TOC, category links, footers, notices.
    Filtered,
    /// `h1`–`h6`, or a `div.mw-heading` wrapper around one.
    Heading(u8),
    Paragraph,
    List { ordered: bool },
    Preformatted,
    Table,
    /// Generic grouping element; only its paragraphs are converted.
    Fallback,
    Unknown,
}

/// Classify a block-level element. First match wins.
pub fn classify(el: ElementRef<'_>) -> ElementKind {
    if is_chrome(el) {
        return ElementKind::Filtered;
    }

    let name = el.value().name();
    if let Some(level) = heading_level(name) {
        return ElementKind::Heading(level);
    }

    match name {
        "p" => ElementKind::Paragraph,
        "ul" => ElementKind::List { ordered: false },
        "ol" => ElementKind::List { ordered: true },
        "pre" => ElementKind::Preformatted,
        "table" => ElementKind::Table,
        "div" | "section" => match wrapped_heading(el) {
            Some(heading) => ElementKind::Heading(
                heading_level(heading.value().name()).unwrap_or(2),
            ),
            None => ElementKind::Fallback,
        },
        _ => ElementKind::Unknown,
    }
}

/// Whether the element carries a known chrome marker.
pub fn is_chrome(el: ElementRef<'_>) -> bool {
    let value = el.value();
    if value.classes().any(|class| CHROME_CLASSES.contains(&class)) {
        return true;
    }
    value.id().is_some_and(|id| CHROME_IDS.contains(&id))
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Newer MediaWiki skins wrap headings: `<div class="mw-heading"><h2>…</h2>…</div>`.
fn wrapped_heading(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if !el.value().classes().any(|class| class == "mw-heading") {
        return None;
    }
    el.children()
        .filter_map(ElementRef::wrap)
        .find(|child| heading_level(child.value().name()).is_some())
}

/// Text content of an element, skipping chrome-marked descendants.
pub fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_visible_text(el, &mut out);
    out
}

fn collect_visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_chrome(child_el) {
                        collect_visible_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Heading text with the trailing `[edit]` affordance removed, trimmed.
///
/// The validator applies the same rule to headings it reads back from disk.
pub fn clean_heading_text(raw: &str) -> &str {
    let text = raw.trim();
    match text.find(EDIT_MARKER) {
        Some(idx) => text[..idx].trim(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_child_kind(body: &str) -> ElementKind {
        let doc = Html::parse_fragment(body);
        let root = doc.root_element();
        let el = root.children().find_map(ElementRef::wrap).unwrap();
        classify(el)
    }

    #[test]
    fn classifies_block_elements() {
        assert_eq!(first_child_kind("<h3>Usage</h3>"), ElementKind::Heading(3));
        assert_eq!(first_child_kind("<p>text</p>"), ElementKind::Paragraph);
        assert_eq!(
            first_child_kind("<ol><li>a</li></ol>"),
            ElementKind::List { ordered: true }
        );
        assert_eq!(
            first_child_kind("<ul><li>a</li></ul>"),
            ElementKind::List { ordered: false }
        );
        assert_eq!(first_child_kind("<pre>ls</pre>"), ElementKind::Preformatted);
        assert_eq!(
            first_child_kind("<table><tr><td>1</td></tr></table>"),
            ElementKind::Table
        );
        assert_eq!(first_child_kind("<div><p>x</p></div>"), ElementKind::Fallback);
        assert_eq!(first_child_kind("<blockquote>q</blockquote>"), ElementKind::Unknown);
    }

    #[test]
    fn chrome_markers_win_over_element_kind() {
        assert_eq!(
            first_child_kind(r#"<div id="toc"><h2>Contents</h2></div>"#),
            ElementKind::Filtered
        );
        assert_eq!(
            first_child_kind(r#"<p class="noprint">print me not</p>"#),
            ElementKind::Filtered
        );
        assert_eq!(
            first_child_kind(r#"<div class="catlinks">Category: About</div>"#),
            ElementKind::Filtered
        );
    }

    #[test]
    fn wrapped_heading_takes_inner_level() {
        let kind = first_child_kind(
            r#"<div class="mw-heading mw-heading3"><h3 id="Simplicity">Simplicity</h3></div>"#,
        );
        assert_eq!(kind, ElementKind::Heading(3));
    }

    #[test]
    fn visible_text_skips_edit_section() {
        let doc = Html::parse_fragment(
            r#"<h2><span class="mw-headline">Principles</span><span class="mw-editsection"><span class="mw-editsection-bracket">[</span><a href="/edit">edit</a><span class="mw-editsection-bracket">]</span></span></h2>"#,
        );
        let sel = Selector::parse("h2").unwrap();
        let h2 = doc.select(&sel).next().unwrap();
        assert_eq!(visible_text(h2), "Principles");
    }

    #[test]
    fn clean_heading_text_strips_edit_marker() {
        assert_eq!(clean_heading_text("  Modernity[edit] "), "Modernity");
        assert_eq!(clean_heading_text("Modernity"), "Modernity");
        assert_eq!(clean_heading_text("[edit]"), "");
    }
}
