//! Post-crawl link validator.
//!
//! Walks a mirrored document tree and checks every `[text](target)` link:
//! absolute references must parse as URLs, relative references must name an
//! existing document (or an identifier recorded in the rejection ledger), and
//! anchors must name a heading of their target document.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;
use walkdir::WalkDir;

use wikimirror_markdown::{clean_heading_text, is_fence_line, scan_links, split_anchor};
use wikimirror_shared::{DOCUMENT_EXTENSION, LedgerEntry, PageId, read_ledger};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+)$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    MalformedExternalReference,
    BrokenInternalLink,
    BrokenAnchor,
    WalkFailure,
}

/// One link that does not hold up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Defect {
    pub kind: DefectKind,
    /// Document containing the link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub text: String,
    pub target: String,
    /// Where a relative target was looked for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<PathBuf>,
    /// Underlying error for walk failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Defect {
    fn link(kind: DefectKind, source: &Path, text: &str, target: &str) -> Self {
        Self {
            kind,
            source: Some(source.to_path_buf()),
            text: text.to_string(),
            target: target.to_string(),
            resolved: None,
            detail: None,
        }
    }

    fn walk_failure(detail: impl fmt::Display) -> Self {
        Self {
            kind: DefectKind::WalkFailure,
            source: None,
            text: String::new(),
            target: String::new(),
            resolved: None,
            detail: Some(detail.to_string()),
        }
    }

    fn resolved_to(mut self, path: &Path) -> Self {
        self.resolved = Some(path.to_path_buf());
        self
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self
            .source
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let resolved = self
            .resolved
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        match self.kind {
            DefectKind::MalformedExternalReference => {
                write!(f, "Invalid URL in {source}: [{}]({})", self.text, self.target)
            }
            DefectKind::BrokenInternalLink => write!(
                f,
                "Broken relative link in {source}: [{}]({}) -> {resolved}",
                self.text, self.target
            ),
            DefectKind::BrokenAnchor => write!(
                f,
                "Broken anchor in {source}: [{}]({}) -> {resolved}",
                self.text, self.target
            ),
            DefectKind::WalkFailure => write!(
                f,
                "Error walking directory: {}",
                self.detail.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// Result of validating one document tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub documents_checked: usize,
    pub links_checked: usize,
    pub defects: Vec<Defect>,
}

impl ValidationReport {
    pub fn is_sound(&self) -> bool {
        self.defects.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the tree at `root`, excusing identifiers listed in its
/// `uncrawled_links.txt`.
pub fn validate_links(root: &Path) -> ValidationReport {
    match read_ledger(root) {
        Ok(ledger) => validate_with_ledger(root, &ledger),
        Err(e) => {
            warn!(error = %e, "failed to read ledger");
            let mut report = validate_with_ledger(root, &[]);
            report.defects.insert(0, Defect::walk_failure(e));
            report
        }
    }
}

/// Validate the tree at `root` against an explicit ledger.
#[instrument(skip_all, fields(root = %root.display(), ledger = ledger.len()))]
pub fn validate_with_ledger(root: &Path, ledger: &[LedgerEntry]) -> ValidationReport {
    let excused: HashSet<&PageId> = ledger.iter().map(|entry| &entry.identifier).collect();
    let mut validator = Validator {
        root,
        excused,
        headings: HashMap::new(),
        report: ValidationReport::default(),
    };

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                validator.report.defects.push(Defect::walk_failure(e));
                break;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION)
        {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                validator
                    .report
                    .defects
                    .push(Defect::walk_failure(format!("error reading file {}: {e}", path.display())));
                break;
            }
        };

        validator.check_document(path, &content);
    }

    let report = validator.report;
    info!(
        documents = report.documents_checked,
        links = report.links_checked,
        defects = report.defects.len(),
        "validation finished"
    );
    report
}

struct Validator<'a> {
    root: &'a Path,
    excused: HashSet<&'a PageId>,
    /// Heading texts per target document; `None` when unreadable.
    headings: HashMap<PathBuf, Option<Vec<String>>>,
    report: ValidationReport,
}

impl Validator<'_> {
    fn check_document(&mut self, path: &Path, content: &str) {
        self.report.documents_checked += 1;
        let doc_dir = path.parent().unwrap_or(self.root);

        for link in scan_links(content) {
            self.report.links_checked += 1;

            if is_absolute_reference(link.target) {
                if Url::parse(link.target).is_err() {
                    self.report.defects.push(Defect::link(
                        DefectKind::MalformedExternalReference,
                        path,
                        link.text,
                        link.target,
                    ));
                }
                continue;
            }

            let (file, anchor) = split_anchor(link.target);
            let resolved = if file.is_empty() {
                path.to_path_buf()
            } else {
                doc_dir.join(file)
            };

            if !resolved.exists() {
                if self.is_excused(doc_dir, file) {
                    debug!(target = link.target, "missing target excused by ledger");
                    continue;
                }
                self.report.defects.push(
                    Defect::link(DefectKind::BrokenInternalLink, path, link.text, link.target)
                        .resolved_to(&resolved),
                );
                continue;
            }

            if let Some(anchor) = anchor {
                if !self.has_heading(&resolved, anchor) {
                    self.report.defects.push(
                        Defect::link(DefectKind::BrokenAnchor, path, link.text, link.target)
                            .resolved_to(&resolved),
                    );
                }
            }
        }
    }

    /// Whether the missing `file`, relative to `doc_dir`, names a ledgered
    /// identifier.
    fn is_excused(&self, doc_dir: &Path, file: &str) -> bool {
        let Ok(rel_dir) = doc_dir.strip_prefix(self.root) else {
            return false;
        };
        normalize(&rel_dir.join(file))
            .and_then(|rel| PageId::from_relative_path(&rel))
            .is_some_and(|id| self.excused.contains(&id))
    }

    /// Anchors are compared decoded; wiki hrefs percent-encode characters
    /// such as `"` that appear verbatim in headings.
    fn has_heading(&mut self, target: &Path, anchor: &str) -> bool {
        let decoded = percent_decode_str(anchor).decode_utf8_lossy();
        let anchor = decoded.as_ref();
        let headings = self
            .headings
            .entry(target.to_path_buf())
            .or_insert_with(|| std::fs::read_to_string(target).ok().map(|c| heading_texts(&c)));

        headings.as_ref().is_some_and(|headings| {
            headings
                .iter()
                .any(|text| text == anchor || text.replace(' ', "_") == anchor)
        })
    }
}

fn is_absolute_reference(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// Heading texts of a document, outside fenced code blocks.
fn heading_texts(content: &str) -> Vec<String> {
    let mut in_fence = false;
    let mut headings = Vec::new();
    for line in content.lines() {
        if is_fence_line(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = HEADING_RE.captures(line) {
            let text = clean_heading_text(&caps[1]);
            if !text.is_empty() {
                headings.push(text.to_string());
            }
        }
    }
    headings
}

/// Lexically resolve `.` and `..`. `None` when the path leaves its root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.iter().collect())
}
