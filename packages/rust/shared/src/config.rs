//! Application configuration for wikimirror.
//!
//! User config lives at `~/.wikimirror/wikimirror.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WikiMirrorError};
use crate::types::{PageId, WikiSite};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "wikimirror.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".wikimirror";

// ---------------------------------------------------------------------------
// Config structs (matching wikimirror.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl limits and politeness.
    #[serde(default)]
    pub crawl: CrawlSection,

    /// Where documents are written.
    #[serde(default)]
    pub output: OutputSection,
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Wiki origin.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix under which articles live.
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,

    /// Identifier of the first page fetched.
    #[serde(default = "default_seed")]
    pub seed: String,

    /// Maximum crawl depth from the seed.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of identifiers admitted in one crawl.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Concurrent page fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Delay in ms before each request.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            title_prefix: default_title_prefix(),
            seed: default_seed(),
            max_depth: default_max_depth(),
            max_files: default_max_files(),
            concurrency: default_concurrency(),
            rate_limit_ms: default_rate_limit(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://wiki.archlinux.org".into()
}
fn default_title_prefix() -> String {
    "/title/".into()
}
fn default_seed() -> String {
    "Arch_Linux".into()
}
fn default_max_depth() -> u32 {
    100
}
fn default_max_files() -> usize {
    100
}
fn default_concurrency() -> u32 {
    5
}
fn default_rate_limit() -> u64 {
    5000
}
fn default_user_agent() -> String {
    concat!("wikimirror/", env!("CARGO_PKG_VERSION")).into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Output root for documents and the ledger.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Remove the output root before crawling.
    #[serde(default = "default_true")]
    pub clean: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            clean: true,
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    pub title_prefix: String,
    pub seed: String,
    pub max_depth: u32,
    pub max_files: usize,
    pub concurrency: u32,
    pub rate_limit_ms: u64,
    pub user_agent: String,
    pub output_dir: PathBuf,
    pub clean_output: bool,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.crawl.base_url.clone(),
            title_prefix: config.crawl.title_prefix.clone(),
            seed: config.crawl.seed.clone(),
            max_depth: config.crawl.max_depth,
            max_files: config.crawl.max_files,
            concurrency: config.crawl.concurrency,
            rate_limit_ms: config.crawl.rate_limit_ms,
            user_agent: config.crawl.user_agent.clone(),
            output_dir: PathBuf::from(&config.output.dir),
            clean_output: config.output.clean,
        }
    }
}

impl CrawlConfig {
    /// The wiki described by `base_url` + `title_prefix`.
    pub fn site(&self) -> Result<WikiSite> {
        WikiSite::new(&self.base_url, &self.title_prefix)
    }

    /// The seed as a canonical identifier.
    pub fn seed_id(&self) -> Result<PageId> {
        PageId::new(&self.seed)
            .ok_or_else(|| WikiMirrorError::config(format!("invalid seed '{}'", self.seed)))
    }

    /// Reject settings the crawler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(WikiMirrorError::config("concurrency must be at least 1"));
        }
        self.site()?;
        self.seed_id()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.wikimirror/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WikiMirrorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.wikimirror/wikimirror.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| WikiMirrorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| WikiMirrorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WikiMirrorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| WikiMirrorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WikiMirrorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
