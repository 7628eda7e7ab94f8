//! Wiki crawler: frontier, page pipeline and fetch engine.
//!
//! This crate provides:
//! - [`Frontier`]: concurrent dedup/budget registry and the rejection ledger
//! - [`PagePipeline`]: per-page convert, rewrite, persist and link discovery
//! - [`Crawler`]: bounded, rate-limited fetch loop driving the pipeline

pub mod engine;
pub mod frontier;
pub mod pipeline;

pub use engine::{CrawlProgress, CrawlSummary, Crawler, SilentProgress};
pub use frontier::{Decision, EntryStatus, Frontier, FrontierEntry};
pub use pipeline::{PageOutcome, PagePipeline};
