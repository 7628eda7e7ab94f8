//! Path Resolver and link rewriter.
//!
//! Internal article links produced by the converter (`/title/<id>#anchor`)
//! become paths relative to the document being written. The computation is a
//! pure function of tree shape: it never touches the filesystem.
//!
//! Known limitation: targets are resolved from the output root, counting only
//! the source document's own directory depth. This matches the wiki's mostly
//! flat namespace; it is not a general relative-path algorithm.

use std::path::{Component, Path};

use wikimirror_shared::{DOCUMENT_EXTENSION, PageId, WikiSite};

use crate::links::scan_links;

/// Split `target#anchor`. An empty anchor counts as none.
pub fn split_anchor(target: &str) -> (&str, Option<&str>) {
    match target.split_once('#') {
        Some((path, anchor)) if !anchor.is_empty() => (path, Some(anchor)),
        Some((path, _)) => (path, None),
        None => (target, None),
    }
}

/// Relative reference from the document at `source` (relative to the output
/// root) to the document of `target`.
pub fn relative_reference(source: &Path, target: &PageId, anchor: Option<&str>) -> String {
    let depth = source
        .parent()
        .map(|dir| {
            dir.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);

    let mut reference = "../".repeat(depth);
    reference.push_str(target.as_str());
    reference.push('.');
    reference.push_str(DOCUMENT_EXTENSION);
    if let Some(anchor) = anchor {
        reference.push('#');
        reference.push_str(anchor);
    }
    reference
}

/// Rewrite every article link in `body` for the document at `source`.
///
/// Crawlable articles become relative document paths. Article links the
/// crawler never follows (namespaced pages, language variants) become
/// absolute wiki URLs. Every other link is left untouched.
pub fn rewrite_links(body: &str, source: &Path, site: &WikiSite) -> String {
    let mut out = String::with_capacity(body.len());
    let mut last = 0;

    for link in scan_links(body) {
        if !site.is_article_href(link.target) {
            continue;
        }

        let replacement = match site.page_id(link.target) {
            Some(id) => relative_reference(source, &id, split_anchor(link.target).1),
            None => site.absolute(link.target),
        };

        out.push_str(&body[last..link.start]);
        out.push('[');
        out.push_str(link.text);
        out.push_str("](");
        out.push_str(&replacement);
        out.push(')');
        last = link.end;
    }

    out.push_str(&body[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arch() -> WikiSite {
        WikiSite::new("https://wiki.archlinux.org", "/title/").unwrap()
    }

    fn id(s: &str) -> PageId {
        PageId::new(s).unwrap()
    }

    #[test]
    fn root_document_has_no_prefix() {
        assert_eq!(
            relative_reference(Path::new("Arch_Linux.md"), &id("GNU"), None),
            "GNU.md"
        );
    }

    #[test]
    fn nested_document_climbs_once_per_directory() {
        assert_eq!(
            relative_reference(Path::new("DeveloperWiki/Page.md"), &id("Arch_Linux"), None),
            "../Arch_Linux.md"
        );
        assert_eq!(
            relative_reference(Path::new("a/b/c/Page.md"), &id("GNU"), Some("History")),
            "../../../GNU.md#History"
        );
    }

    #[test]
    fn nested_target_is_resolved_from_root() {
        // Sibling documents still climb to the root and descend again.
        assert_eq!(
            relative_reference(
                Path::new("DeveloperWiki/Page.md"),
                &id("DeveloperWiki/Other"),
                None
            ),
            "../DeveloperWiki/Other.md"
        );
    }

    #[test]
    fn split_anchor_handles_empty_fragment() {
        assert_eq!(split_anchor("GNU#"), ("GNU", None));
        assert_eq!(split_anchor("GNU#History"), ("GNU", Some("History")));
        assert_eq!(split_anchor("GNU"), ("GNU", None));
    }

    #[test]
    fn rewrite_simple_link() {
        let out = rewrite_links("[GNU](/title/GNU)", Path::new("Arch_Linux.md"), &arch());
        assert_eq!(out, "[GNU](GNU.md)");
    }

    #[test]
    fn rewrite_keeps_anchor() {
        let out = rewrite_links(
            "[Project Leader](/title/DeveloperWiki/Project_Leader#history)",
            Path::new("Arch_Linux.md"),
            &arch(),
        );
        assert_eq!(out, "[Project Leader](DeveloperWiki/Project_Leader.md#history)");
    }

    #[test]
    fn rewrite_from_nested_directory() {
        let out = rewrite_links(
            "[Arch Linux](/title/Arch_Linux)",
            Path::new("DeveloperWiki/Project_Leader.md"),
            &arch(),
        );
        assert_eq!(out, "[Arch Linux](../Arch_Linux.md)");
    }

    #[test]
    fn rewrite_multiple_links_and_keeps_surrounding_text() {
        let out = rewrite_links(
            "Check out [GNU](/title/GNU) and [systemd](/title/Systemd).",
            Path::new("Arch_Linux.md"),
            &arch(),
        );
        assert_eq!(out, "Check out [GNU](GNU.md) and [systemd](Systemd.md).");
    }

    #[test]
    fn external_links_unchanged() {
        let out = rewrite_links(
            "[external](https://example.com) and [GNU](/title/GNU)",
            Path::new("Arch_Linux.md"),
            &arch(),
        );
        assert_eq!(out, "[external](https://example.com) and [GNU](GNU.md)");
    }

    #[test]
    fn uncrawlable_articles_become_absolute() {
        let out = rewrite_links(
            "[About](/title/Category:About_Arch)",
            Path::new("Arch_Linux.md"),
            &arch(),
        );
        assert_eq!(
            out,
            "[About](https://wiki.archlinux.org/title/Category:About_Arch)"
        );
    }
}
