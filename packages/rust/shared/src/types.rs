//! Core domain types: page identifiers, the wiki site they live on, and
//! rejection ledger records.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use url::Url;

use crate::error::{Result, WikiMirrorError};

/// File extension of every persisted document.
pub const DOCUMENT_EXTENSION: &str = "md";

// ---------------------------------------------------------------------------
// PageId
// ---------------------------------------------------------------------------

/// Canonical article key: the wiki title path with anchor and query removed.
///
/// `DeveloperWiki/Project_Leader` and `DeveloperWiki/Project_Leader#History`
/// are the same identifier. Slash-separated segments become directories on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(String);

impl PageId {
    /// Canonicalize a raw title path. Returns `None` for titles that cannot
    /// name a document inside the output tree (empty, `.`/`..` segments).
    pub fn new(raw: &str) -> Option<Self> {
        let title = raw.split(['#', '?']).next().unwrap_or_default();
        let title = title.trim_matches('/');
        if title.is_empty() {
            return None;
        }
        let valid = title
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
        valid.then(|| Self(title.to_string()))
    }

    /// Rebuild an identifier from a document path relative to the output root
    /// (`DeveloperWiki/Page.md` → `DeveloperWiki/Page`).
    pub fn from_relative_path(path: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_str()?),
                _ => return None,
            }
        }
        let last = segments.pop()?;
        let stem = last.strip_suffix(&format!(".{DOCUMENT_EXTENSION}"))?;
        segments.push(stem);
        Self::new(&segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Document location relative to the output root.
    pub fn relative_path(&self) -> PathBuf {
        let file = format!("{}.{DOCUMENT_EXTENSION}", self.0);
        file.split('/').collect()
    }

    /// Human-readable title used when the page carries no heading.
    pub fn display_title(&self) -> String {
        self.0.replace('_', " ")
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// WikiSite
// ---------------------------------------------------------------------------

/// The wiki being mirrored: its origin and the path prefix under which
/// articles live (`/title/` on the Arch wiki).
#[derive(Debug, Clone)]
pub struct WikiSite {
    base_url: Url,
    title_prefix: String,
}

impl WikiSite {
    pub fn new(base_url: &str, title_prefix: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WikiMirrorError::config(format!("invalid base_url '{base_url}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(WikiMirrorError::config(format!(
                "base_url must be http(s), got '{base_url}'"
            )));
        }
        if !title_prefix.starts_with('/') || !title_prefix.ends_with('/') {
            return Err(WikiMirrorError::config(format!(
                "title_prefix must start and end with '/', got '{title_prefix}'"
            )));
        }
        Ok(Self {
            base_url,
            title_prefix: title_prefix.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn title_prefix(&self) -> &str {
        &self.title_prefix
    }

    /// Whether `href` is a site-relative article link (`/title/...`).
    pub fn is_article_href(&self, href: &str) -> bool {
        href.starts_with(&self.title_prefix)
    }

    /// Identifier of a crawlable article, if `href` names one.
    ///
    /// Accepts site-relative hrefs and absolute URLs on the same host (any
    /// scheme). Namespaced pages (`Special:`, `Category:` …) and language
    /// variants (`Title (Español)`) are not crawlable.
    pub fn page_id(&self, href: &str) -> Option<PageId> {
        let path = if self.is_article_href(href) {
            href.to_string()
        } else {
            let url = Url::parse(href).ok()?;
            if url.host_str() != self.base_url.host_str()
                || url.port_or_known_default() != self.base_url.port_or_known_default()
            {
                return None;
            }
            url.path().to_string()
        };

        let title = path.strip_prefix(&self.title_prefix)?;
        let id = PageId::new(title)?;
        if id.as_str().contains(':') || id.as_str().contains('(') {
            return None;
        }
        Some(id)
    }

    /// Absolute URL of an article.
    pub fn page_url(&self, id: &PageId) -> Result<Url> {
        let path = format!("{}{}", self.title_prefix, id.as_str());
        self.base_url
            .join(&path)
            .map_err(|e| WikiMirrorError::parse(format!("cannot build URL for '{id}': {e}")))
    }

    /// Absolute form of a site-relative href.
    pub fn absolute(&self, href: &str) -> String {
        match self.base_url.join(href) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.base_url.as_str().trim_end_matches('/'), href),
        }
    }
}

// ---------------------------------------------------------------------------
// Rejection ledger records
// ---------------------------------------------------------------------------

/// Why a discovered identifier was not admitted to the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The file budget was exhausted.
    MaxFiles,
    /// The discovering page already sat at the maximum depth.
    MaxDepth,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxFiles => "max_files_limit",
            Self::MaxDepth => "max_depth",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RejectReason {
    type Err = WikiMirrorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max_files_limit" => Ok(Self::MaxFiles),
            "max_depth" => Ok(Self::MaxDepth),
            other => Err(WikiMirrorError::parse(format!(
                "unknown reject reason '{other}'"
            ))),
        }
    }
}

/// One identifier that was discovered but deliberately never crawled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub identifier: PageId,
    pub reason: RejectReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arch() -> WikiSite {
        WikiSite::new("https://wiki.archlinux.org", "/title/").unwrap()
    }

    #[test]
    fn page_id_strips_anchor_and_query() {
        let a = PageId::new("Installation_guide#Pre-installation").unwrap();
        let b = PageId::new("Installation_guide?action=raw").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Installation_guide");
    }

    #[test]
    fn page_id_rejects_escaping_segments() {
        assert!(PageId::new("").is_none());
        assert!(PageId::new("#top").is_none());
        assert!(PageId::new("../etc/passwd").is_none());
        assert!(PageId::new("a//b").is_none());
    }

    #[test]
    fn page_id_relative_path_nests_segments() {
        let id = PageId::new("DeveloperWiki/Project_Leader").unwrap();
        assert_eq!(
            id.relative_path(),
            PathBuf::from("DeveloperWiki").join("Project_Leader.md")
        );
        assert_eq!(PageId::from_relative_path(&id.relative_path()), Some(id));
    }

    #[test]
    fn page_id_relative_path_keeps_dotted_titles() {
        let id = PageId::new("Node.js").unwrap();
        assert_eq!(id.relative_path(), PathBuf::from("Node.js.md"));
    }

    #[test]
    fn page_id_from_relative_path_requires_extension() {
        assert!(PageId::from_relative_path(Path::new("GNU.txt")).is_none());
        assert!(PageId::from_relative_path(Path::new("../GNU.md")).is_none());
        assert_eq!(
            PageId::from_relative_path(Path::new("GNU.md")).unwrap().as_str(),
            "GNU"
        );
    }

    #[test]
    fn display_title_replaces_underscores() {
        let id = PageId::new("Arch_Linux").unwrap();
        assert_eq!(id.display_title(), "Arch Linux");
    }

    #[test]
    fn site_page_id_accepts_relative_and_same_host() {
        let site = arch();
        assert_eq!(site.page_id("/title/GNU").unwrap().as_str(), "GNU");
        assert_eq!(
            site.page_id("http://wiki.archlinux.org/title/GNU#History")
                .unwrap()
                .as_str(),
            "GNU"
        );
        assert!(site.page_id("https://en.wikipedia.org/title/GNU").is_none());
        assert!(site.page_id("/index.php?title=GNU").is_none());
    }

    #[test]
    fn site_page_id_skips_namespaces_and_languages() {
        let site = arch();
        assert!(site.page_id("/title/Category:About_Arch").is_none());
        assert!(site.page_id("/title/Special:Search").is_none());
        assert!(site.page_id("/title/Arch_Linux_(Espa%C3%B1ol)").is_none());
    }

    #[test]
    fn site_page_url_joins_prefix() {
        let site = arch();
        let id = PageId::new("DeveloperWiki/Page").unwrap();
        assert_eq!(
            site.page_url(&id).unwrap().as_str(),
            "https://wiki.archlinux.org/title/DeveloperWiki/Page"
        );
    }

    #[test]
    fn site_rejects_bad_prefix() {
        assert!(WikiSite::new("https://wiki.archlinux.org", "title").is_err());
        assert!(WikiSite::new("ftp://wiki.archlinux.org", "/title/").is_err());
    }

    #[test]
    fn reject_reason_roundtrips_ledger_names() {
        assert_eq!(RejectReason::MaxFiles.to_string(), "max_files_limit");
        assert_eq!(
            "max_depth".parse::<RejectReason>().unwrap(),
            RejectReason::MaxDepth
        );
        assert!("too_far".parse::<RejectReason>().is_err());
    }
}
