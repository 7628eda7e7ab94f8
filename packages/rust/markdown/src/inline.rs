//! Inline rendering shared by paragraphs and list items.

use scraper::ElementRef;
use scraper::node::Node;

use crate::ConvertOptions;
use crate::cleanup::collapse_whitespace;
use crate::elements::{is_chrome, visible_text};
use crate::links::escape_link_text;

/// Render an element's child nodes left to right as inline Markdown.
///
/// Block-level children (nested lists, tables, code blocks) contribute
/// nothing here; the list rule renders nested lists itself.
pub(crate) fn render_inline(el: ElementRef<'_>, opts: &ConvertOptions) -> String {
    let mut out = String::new();

    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_chrome(child_el) {
                    continue;
                }
                render_element(child_el, opts, &mut out);
            }
            _ => {}
        }
    }

    out
}

fn render_element(el: ElementRef<'_>, opts: &ConvertOptions, out: &mut String) {
    match el.value().name() {
        "a" => render_anchor(el, opts, out),
        "code" => {
            out.push('`');
            out.push_str(&visible_text(el));
            out.push('`');
        }
        "i" | "em" => {
            out.push('_');
            out.push_str(&visible_text(el));
            out.push('_');
        }
        "b" | "strong" => {
            out.push_str("**");
            out.push_str(&visible_text(el));
            out.push_str("**");
        }
        "ul" | "ol" | "table" | "pre" | "div" => {}
        _ => out.push_str(&visible_text(el)),
    }
}

fn render_anchor(el: ElementRef<'_>, opts: &ConvertOptions, out: &mut String) {
    let Some(href) = el.value().attr("href") else {
        out.push_str(&visible_text(el));
        return;
    };

    let text = collapse_whitespace(&visible_text(el));
    if text.is_empty() {
        return;
    }

    if href.starts_with(&opts.title_prefix) || href.starts_with("http") {
        out.push('[');
        out.push_str(&escape_link_text(&text));
        out.push_str("](");
        out.push_str(href);
        out.push(')');
    } else {
        out.push_str(&text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn render(html: &str) -> String {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("p, li").unwrap();
        let el = doc.select(&sel).next().unwrap();
        render_inline(el, &ConvertOptions::default())
    }

    #[test]
    fn renders_internal_and_external_links() {
        assert_eq!(
            render(r#"<p>See <a href="/title/GNU">GNU</a> and <a href="https://kernel.org">the kernel</a>.</p>"#),
            "See [GNU](/title/GNU) and [the kernel](https://kernel.org)."
        );
    }

    #[test]
    fn other_hrefs_keep_only_text() {
        assert_eq!(
            render(r##"<p>Jump to <a href="#Usage">usage</a> or <a href="/index.php?title=X">edit</a></p>"##),
            "Jump to usage or edit"
        );
    }

    #[test]
    fn drops_links_without_text() {
        assert_eq!(
            render(r#"<p>Icon<a href="/title/File:Logo.png"> </a>here</p>"#),
            "Iconhere"
        );
    }

    #[test]
    fn renders_emphasis_and_code() {
        assert_eq!(
            render("<p>Run <code>pacman -Syu</code>, <i>always</i> <b>carefully</b>, <em>a</em> <strong>b</strong></p>"),
            "Run `pacman -Syu`, _always_ **carefully**, _a_ **b**"
        );
    }

    #[test]
    fn unknown_inline_elements_keep_text() {
        assert_eq!(
            render("<p>Press <kbd>Ctrl</kbd>+<span>C</span></p>"),
            "Press Ctrl+C"
        );
    }

    #[test]
    fn chrome_inside_paragraph_is_dropped() {
        assert_eq!(
            render(r#"<p>Text<span class="noprint">[hidden]</span> end</p>"#),
            "Text end"
        );
    }

    #[test]
    fn nested_lists_are_not_inlined() {
        assert_eq!(render("<ul><li>outer<ul><li>inner</li></ul></li></ul>"), "outer");
    }

    #[test]
    fn brackets_in_link_text_are_escaped() {
        let out = render(r#"<p>Note <a href="/title/GNU">[1]</a> here.</p>"#);
        assert_eq!(out, r"Note [\[1\]](/title/GNU) here.");
        let links = crate::scan_links(&out);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "/title/GNU");
    }

    #[test]
    fn link_text_whitespace_is_collapsed() {
        assert_eq!(
            render("<p><a href=\"/title/Pacman\">the\n  package manager</a></p>"),
            "[the package manager](/title/Pacman)"
        );
    }
}
