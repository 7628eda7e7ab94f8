//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use wikimirror_crawler::{CrawlProgress, Crawler};
use wikimirror_shared::{AppConfig, CrawlConfig, PageId, WikiMirrorError, init_config, load_config};
use wikimirror_validate::{ValidationReport, validate_links};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// wikimirror: offline Markdown mirror of a documentation wiki.
#[derive(Parser)]
#[command(
    name = "wikimirror",
    version,
    about = "Mirror a documentation wiki into Markdown files and validate their links.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl the wiki from the seed page into the output directory.
    Crawl(CrawlArgs),

    /// Check every link in a mirrored output directory.
    Validate {
        /// Output directory produced by `crawl`.
        output: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags overriding the `[crawl]` / `[output]` config sections.
#[derive(Args, Debug, Default)]
pub(crate) struct CrawlArgs {
    /// Maximum link depth from the seed page.
    #[arg(long)]
    pub depth: Option<u32>,

    /// Maximum number of pages admitted to the crawl.
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Number of concurrent fetches.
    #[arg(long)]
    pub concurrent: Option<u32>,

    /// Delay before each request, in milliseconds.
    #[arg(long)]
    pub rate: Option<u64>,

    /// Output directory.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seed page identifier (e.g. `Arch_Linux`).
    #[arg(long)]
    pub seed: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "wikimirror=info",
        1 => "wikimirror=debug",
        _ => "wikimirror=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl(args) => cmd_crawl(args).await,
        Command::Validate { output, json } => cmd_validate(&output, json),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_crawl(args: CrawlArgs) -> Result<()> {
    let config = load_config()?;
    let crawl_config = crawl_config(&config, args);

    info!(
        seed = %crawl_config.seed,
        output = %crawl_config.output_dir.display(),
        "crawling wiki"
    );

    let crawler = Crawler::new(crawl_config.clone())?;
    let reporter = CliProgress::new();
    let summary = crawler.crawl(&reporter).await?;
    reporter.finish();

    println!();
    println!("  Crawl finished!");
    println!("  Written:  {}", summary.documents_written);
    println!("  Failed:   {}", summary.pages_failed);
    println!("  Empty:    {}", summary.pages_empty);
    println!("  Rejected: {}", summary.rejected);
    if let Some(ledger) = &summary.ledger_path {
        println!("  Ledger:   {}", ledger.display());
    }
    println!("  Output:   {}", crawl_config.output_dir.display());
    println!("  Time:     {:.1}s", summary.duration.as_secs_f64());
    println!();

    Ok(())
}

/// Merge CLI flags over the loaded config.
fn crawl_config(config: &AppConfig, args: CrawlArgs) -> CrawlConfig {
    let mut crawl = CrawlConfig::from(config);
    if let Some(depth) = args.depth {
        crawl.max_depth = depth;
    }
    if let Some(max_files) = args.max_files {
        crawl.max_files = max_files;
    }
    if let Some(concurrent) = args.concurrent {
        crawl.concurrency = concurrent;
    }
    if let Some(rate) = args.rate {
        crawl.rate_limit_ms = rate;
    }
    if let Some(output) = args.output {
        crawl.output_dir = output;
    }
    if let Some(seed) = args.seed {
        crawl.seed = seed;
    }
    crawl
}

fn cmd_validate(output: &Path, json: bool) -> Result<()> {
    let report = validate_links(output);
    println!("{}", format_report(&report, json)?);

    if !report.is_sound() {
        std::process::exit(1);
    }
    Ok(())
}

fn format_report(report: &ValidationReport, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(report)?);
    }
    if report.is_sound() {
        return Ok("All links validated successfully!".to_string());
    }

    let mut out = String::from("\nFound link validation errors:");
    for defect in &report.defects {
        out.push_str(&format!("\n- {defect}"));
    }
    Ok(out)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} [{pos}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl CrawlProgress for CliProgress {
    fn page_written(&self, id: &PageId, _path: &Path) {
        self.spinner.inc(1);
        self.spinner.set_message(format!("Wrote {id}"));
    }

    fn page_empty(&self, id: &PageId) {
        self.spinner.set_message(format!("Nothing extracted from {id}"));
    }

    fn page_failed(&self, id: &PageId, error: &WikiMirrorError) {
        self.spinner.set_message(format!("Failed {id}: {error}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let config = AppConfig::default();
        let args = CrawlArgs {
            depth: Some(2),
            max_files: Some(10),
            seed: Some("Pacman".into()),
            ..Default::default()
        };
        let crawl = crawl_config(&config, args);
        assert_eq!(crawl.max_depth, 2);
        assert_eq!(crawl.max_files, 10);
        assert_eq!(crawl.seed, "Pacman");
        assert_eq!(crawl.concurrency, config.crawl.concurrency);
        assert_eq!(crawl.output_dir, PathBuf::from(&config.output.dir));
    }

    #[test]
    fn missing_output_is_listed_as_walk_error() {
        let missing = std::env::temp_dir().join("wikimirror-cli-missing-output-dir");
        let report = validate_links(&missing);
        assert!(!report.is_sound());

        let text = format_report(&report, false).unwrap();
        assert!(text.starts_with("\nFound link validation errors:\n- Error walking directory: "));

        let json: serde_json::Value = serde_json::from_str(&format_report(&report, true).unwrap()).unwrap();
        assert_eq!(json["defects"][0]["kind"], "walk_failure");
    }

    #[test]
    fn sound_report_prints_success() {
        let report = ValidationReport::default();
        assert_eq!(
            format_report(&report, false).unwrap(),
            "All links validated successfully!"
        );
    }

    #[test]
    fn parses_crawl_flags() {
        let cli = Cli::try_parse_from([
            "wikimirror",
            "crawl",
            "--depth",
            "3",
            "--concurrent",
            "4",
            "--rate",
            "100",
            "--output",
            "mirror",
        ])
        .unwrap();
        let Command::Crawl(args) = cli.command else {
            panic!("expected crawl");
        };
        assert_eq!(args.depth, Some(3));
        assert_eq!(args.concurrent, Some(4));
        assert_eq!(args.rate, Some(100));
        assert_eq!(args.output, Some(PathBuf::from("mirror")));
    }

    #[test]
    fn parses_validate_positional() {
        let cli = Cli::try_parse_from(["wikimirror", "validate", "output", "--json"]).unwrap();
        let Command::Validate { output, json } = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(output, PathBuf::from("output"));
        assert!(json);
    }
}
