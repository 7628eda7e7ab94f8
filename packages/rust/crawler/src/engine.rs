//! Concurrent wiki crawler engine.
//!
//! The crawler admits the seed through the frontier, fetches admitted pages
//! on a bounded worker pool with a fixed per-request delay, hands each page
//! to the [`PagePipeline`], and writes the rejection ledger once the queue
//! drains.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use scraper::Html;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use wikimirror_shared::{
    CrawlConfig, PageId, Result, WikiMirrorError, WikiSite, write_ledger,
};

use crate::frontier::{Decision, Frontier};
use crate::pipeline::{PageOutcome, PagePipeline};

// ---------------------------------------------------------------------------
// CrawlSummary / progress
// ---------------------------------------------------------------------------

/// Summary of a completed crawl.
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Documents persisted to the output tree.
    pub documents_written: usize,
    /// Pages whose fetch or persist failed.
    pub pages_failed: usize,
    /// Pages fetched but yielding no content.
    pub pages_empty: usize,
    /// Identifiers recorded in the rejection ledger.
    pub rejected: usize,
    /// Ledger file, when anything was rejected.
    pub ledger_path: Option<PathBuf>,
    pub duration: Duration,
}

/// Per-page notifications from the crawl loop.
pub trait CrawlProgress: Send + Sync {
    fn page_written(&self, _id: &PageId, _path: &Path) {}
    fn page_empty(&self, _id: &PageId) {}
    fn page_failed(&self, _id: &PageId, _error: &WikiMirrorError) {}
}

/// Progress reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl CrawlProgress for SilentProgress {}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

type FetchResult = (PageId, Result<PageOutcome>);

/// Wiki crawler bounded by a file budget and a link depth.
pub struct Crawler {
    config: CrawlConfig,
    site: WikiSite,
    client: Client,
}

impl Crawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        config.validate()?;
        let site = config.site()?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WikiMirrorError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            site,
            client,
        })
    }

    /// Crawl from the configured seed into the configured output directory.
    #[instrument(skip_all, fields(seed = %self.config.seed, output = %self.config.output_dir.display()))]
    pub async fn crawl(&self, progress: &dyn CrawlProgress) -> Result<CrawlSummary> {
        let start_time = Instant::now();
        self.prepare_output()?;

        let frontier = Arc::new(Frontier::new(self.config.max_files, self.config.max_depth));
        let pipeline = Arc::new(PagePipeline::new(
            Arc::clone(&frontier),
            self.site.clone(),
            &self.config.output_dir,
        ));
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency as usize));

        info!(
            max_depth = self.config.max_depth,
            max_files = self.config.max_files,
            concurrency = self.config.concurrency,
            rate_limit_ms = self.config.rate_limit_ms,
            "starting crawl"
        );

        let mut tasks: JoinSet<FetchResult> = JoinSet::new();
        let seed = self.config.seed_id()?;
        match frontier.seed(&seed) {
            Decision::Admit(_) => self.spawn_fetch(&mut tasks, &pipeline, &semaphore, seed),
            decision => warn!(identifier = %seed, ?decision, "seed not admitted"),
        }

        let mut documents_written = 0;
        let mut pages_failed = 0;
        let mut pages_empty = 0;

        while let Some(joined) = tasks.join_next().await {
            let (id, result) = match joined {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(error = %e, "fetch task aborted");
                    pages_failed += 1;
                    continue;
                }
            };

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(identifier = %id, error = %e, "fetch failed");
                    progress.page_failed(&id, &e);
                    pages_failed += 1;
                    continue;
                }
            };

            match &outcome {
                PageOutcome::Written { path, .. } => {
                    documents_written += 1;
                    progress.page_written(&id, path);
                }
                PageOutcome::PersistFailed { .. } => {
                    pages_failed += 1;
                    let error = WikiMirrorError::io(
                        self.config.output_dir.join(id.relative_path()),
                        std::io::Error::other("document not written"),
                    );
                    progress.page_failed(&id, &error);
                }
                PageOutcome::Empty => {
                    pages_empty += 1;
                    progress.page_empty(&id);
                }
            }

            for next in outcome.enqueue() {
                self.spawn_fetch(&mut tasks, &pipeline, &semaphore, next.clone());
            }
        }

        let ledger = frontier.snapshot_ledger();
        let ledger_path = write_ledger(&self.config.output_dir, &ledger)?;

        let summary = CrawlSummary {
            documents_written,
            pages_failed,
            pages_empty,
            rejected: ledger.len(),
            ledger_path,
            duration: start_time.elapsed(),
        };

        info!(
            documents_written = summary.documents_written,
            pages_failed = summary.pages_failed,
            pages_empty = summary.pages_empty,
            rejected = summary.rejected,
            duration_ms = summary.duration.as_millis(),
            "crawl completed"
        );

        Ok(summary)
    }

    fn spawn_fetch(
        &self,
        tasks: &mut JoinSet<FetchResult>,
        pipeline: &Arc<PagePipeline>,
        semaphore: &Arc<Semaphore>,
        id: PageId,
    ) {
        let client = self.client.clone();
        let site = self.site.clone();
        let pipeline = Arc::clone(pipeline);
        let semaphore = Arc::clone(semaphore);
        let rate_limit = self.config.rate_limit_ms;

        tasks.spawn(async move {
            let result = async {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| WikiMirrorError::Network(format!("worker pool closed: {e}")))?;

                if rate_limit > 0 {
                    tokio::time::sleep(Duration::from_millis(rate_limit)).await;
                }

                let url = site.page_url(&id)?;
                let body = fetch_page(&client, &url).await?;

                let outcome = {
                    let doc = Html::parse_document(&body);
                    pipeline.handle_page(&id, &doc)
                };
                Ok::<_, WikiMirrorError>(outcome)
            }
            .await;
            (id, result)
        });
    }

    /// Clean (when configured) and create the output directory.
    fn prepare_output(&self) -> Result<()> {
        let dir = &self.config.output_dir;
        if self.config.clean_output && dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(dir) {
                warn!(path = %dir.display(), error = %e, "failed to clean output directory");
            }
        }
        std::fs::create_dir_all(dir).map_err(|e| WikiMirrorError::io(dir, e))
    }
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

/// Fetch a page body. Non-success statuses are errors.
async fn fetch_page(client: &Client, url: &url::Url) -> Result<String> {
    debug!(%url, "fetching page");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| WikiMirrorError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(WikiMirrorError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| WikiMirrorError::Network(format!("{url}: body read failed: {e}")))
}
