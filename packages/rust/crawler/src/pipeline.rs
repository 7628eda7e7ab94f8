//! Per-page processing: convert, rewrite, persist, discover.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

use wikimirror_markdown::{
    ConvertOptions, content_root, convert_root, page_title, render_document, rewrite_links,
};
use wikimirror_shared::{PageId, Result, WikiMirrorError, WikiSite};

use crate::frontier::{Decision, Frontier};

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// What happened to one fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Document persisted; `enqueue` holds newly admitted identifiers.
    Written { path: PathBuf, enqueue: Vec<PageId> },
    /// The document could not be written. Discovery still ran.
    PersistFailed { enqueue: Vec<PageId> },
    /// Nothing extracted; no document and no discovery.
    Empty,
}

impl PageOutcome {
    pub fn enqueue(&self) -> &[PageId] {
        match self {
            Self::Written { enqueue, .. } | Self::PersistFailed { enqueue } => enqueue,
            Self::Empty => &[],
        }
    }
}

/// Turns fetched pages into documents and feeds discovered links to the
/// frontier.
#[derive(Debug)]
pub struct PagePipeline {
    frontier: Arc<Frontier>,
    site: WikiSite,
    output_dir: PathBuf,
    opts: ConvertOptions,
}

impl PagePipeline {
    pub fn new(frontier: Arc<Frontier>, site: WikiSite, output_dir: impl Into<PathBuf>) -> Self {
        let opts = ConvertOptions {
            title_prefix: site.title_prefix().to_string(),
        };
        Self {
            frontier,
            site,
            output_dir: output_dir.into(),
            opts,
        }
    }

    /// Process one fetched page.
    #[instrument(skip_all, fields(identifier = %id))]
    pub fn handle_page(&self, id: &PageId, doc: &Html) -> PageOutcome {
        let Some(root) = content_root(doc) else {
            warn!("no content root, skipping page");
            return PageOutcome::Empty;
        };

        let title = page_title(doc).unwrap_or_else(|| id.display_title());
        let body = convert_root(Some(&title), root, &self.opts);
        if body.is_empty() {
            warn!("nothing extracted, skipping page");
            return PageOutcome::Empty;
        }

        let relative = id.relative_path();
        let body = rewrite_links(&body, &relative, &self.site);

        let depth = self.frontier.depth_of(id).unwrap_or(0);
        let enqueue = self.discover_links(root, depth);

        match self.persist(id, &relative, &title, &body) {
            Ok(path) => {
                self.frontier.mark_visited(id);
                debug!(path = %path.display(), discovered = enqueue.len(), "document written");
                PageOutcome::Written { path, enqueue }
            }
            Err(e) => {
                warn!(error = %e, "failed to persist document");
                PageOutcome::PersistFailed { enqueue }
            }
        }
    }

    /// Offer every crawlable link in the content root to the frontier.
    fn discover_links(&self, root: ElementRef<'_>, depth: u32) -> Vec<PageId> {
        let mut enqueue = Vec::new();
        for link in root.select(&LINK_SEL) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(target) = self.site.page_id(href) else {
                continue;
            };
            if let Decision::Admit(_) = self.frontier.discover(&target, depth) {
                enqueue.push(target);
            }
        }
        enqueue
    }

    fn persist(&self, id: &PageId, relative: &Path, title: &str, body: &str) -> Result<PathBuf> {
        let url = self.site.page_url(id)?;
        let document = render_document(title, url.as_str(), &Utc::now().to_rfc3339(), body);

        let path = self.output_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WikiMirrorError::io(parent, e))?;
        }
        std::fs::write(&path, document).map_err(|e| WikiMirrorError::io(&path, e))?;
        Ok(path)
    }
}
