//! The `uncrawled_links.txt` file: identifiers the crawl deliberately skipped.
//!
//! One `<identifier>\t<reason>` line per rejection. The file is only written
//! when at least one identifier was rejected.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, WikiMirrorError};
use crate::types::{LedgerEntry, PageId};

/// Ledger file name inside the output root.
pub const LEDGER_FILE_NAME: &str = "uncrawled_links.txt";

/// Persist the ledger under `output_dir`. Returns the written path, or `None`
/// when there was nothing to record.
pub fn write_ledger(output_dir: &Path, entries: &[LedgerEntry]) -> Result<Option<PathBuf>> {
    if entries.is_empty() {
        debug!("no rejected identifiers, ledger not written");
        return Ok(None);
    }

    let mut content = String::new();
    for entry in entries {
        content.push_str(entry.identifier.as_str());
        content.push('\t');
        content.push_str(entry.reason.as_str());
        content.push('\n');
    }

    let path = output_dir.join(LEDGER_FILE_NAME);
    std::fs::write(&path, content).map_err(|e| WikiMirrorError::io(&path, e))?;
    debug!(?path, entries = entries.len(), "ledger written");
    Ok(Some(path))
}

/// Load the ledger from `output_dir`. A missing file is an empty ledger;
/// malformed lines are skipped with a warning.
pub fn read_ledger(output_dir: &Path) -> Result<Vec<LedgerEntry>> {
    let path = output_dir.join(LEDGER_FILE_NAME);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| WikiMirrorError::io(&path, e))?;
    let mut entries = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(?path, line = lineno + 1, error = %e, "skipping ledger line"),
        }
    }
    Ok(entries)
}

fn parse_line(line: &str) -> Result<LedgerEntry> {
    let (identifier, reason) = line
        .split_once('\t')
        .ok_or_else(|| WikiMirrorError::parse(format!("missing tab separator in '{line}'")))?;
    let identifier = PageId::new(identifier)
        .ok_or_else(|| WikiMirrorError::parse(format!("invalid identifier '{identifier}'")))?;
    Ok(LedgerEntry {
        identifier,
        reason: reason.trim().parse()?,
    })
}
