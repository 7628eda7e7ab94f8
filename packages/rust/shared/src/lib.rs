//! Shared types, error model, and configuration for wikimirror.
//!
//! This crate is the foundation depended on by all other wikimirror crates.
//! It provides:
//! - [`WikiMirrorError`]: the unified error type
//! - Domain types ([`PageId`], [`WikiSite`], [`RejectReason`], [`LedgerEntry`])
//! - The rejection ledger file format ([`write_ledger`], [`read_ledger`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod ledger;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSection, OutputSection, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{Result, WikiMirrorError};
pub use ledger::{LEDGER_FILE_NAME, read_ledger, write_ledger};
pub use types::{DOCUMENT_EXTENSION, LedgerEntry, PageId, RejectReason, WikiSite};
