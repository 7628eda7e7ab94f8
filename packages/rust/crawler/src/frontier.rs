//! Crawl frontier: dedup, depth assignment and the file budget.
//!
//! The frontier is the only shared mutable state of a crawl. Every pipeline
//! invocation holds an `Arc<Frontier>`; the entry map and the rejection
//! ledger sit behind one mutex, while the admitted count is an atomic that
//! can be read without taking the lock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use wikimirror_shared::{LedgerEntry, PageId, RejectReason};

/// Outcome of offering an identifier to the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Newly admitted at the given depth; the caller must fetch it.
    Admit(u32),
    /// Newly rejected; a ledger record was created.
    Reject(RejectReason),
    /// Seen before (admitted or rejected); nothing changed.
    AlreadyKnown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Queued,
    Visited,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierEntry {
    pub depth: u32,
    pub status: EntryStatus,
}

#[derive(Debug, Default)]
struct FrontierState {
    entries: HashMap<PageId, FrontierEntry>,
    rejected: HashSet<PageId>,
    ledger: Vec<LedgerEntry>,
}

/// Registry of discovered identifiers and their admission state.
#[derive(Debug)]
pub struct Frontier {
    max_files: usize,
    max_depth: u32,
    admitted: AtomicUsize,
    state: Mutex<FrontierState>,
}

impl Frontier {
    pub fn new(max_files: usize, max_depth: u32) -> Self {
        Self {
            max_files,
            max_depth,
            admitted: AtomicUsize::new(0),
            state: Mutex::new(FrontierState::default()),
        }
    }

    /// Admit the crawl's starting identifier at depth 0.
    ///
    /// The seed consumes one budget unit; it is only rejected when the
    /// budget is zero.
    pub fn seed(&self, id: &PageId) -> Decision {
        let mut state = self.lock();
        if state.is_known(id) {
            return Decision::AlreadyKnown;
        }
        if !self.take_budget() {
            return reject(&mut state, id, RejectReason::MaxFiles);
        }
        state.entries.insert(
            id.clone(),
            FrontierEntry {
                depth: 0,
                status: EntryStatus::Queued,
            },
        );
        Decision::Admit(0)
    }

    /// Offer an identifier found on a page at `parent_depth`.
    ///
    /// A depth rejection still consumes the budget unit it took.
    pub fn discover(&self, id: &PageId, parent_depth: u32) -> Decision {
        let mut state = self.lock();
        if state.is_known(id) {
            return Decision::AlreadyKnown;
        }

        if !self.take_budget() {
            return reject(&mut state, id, RejectReason::MaxFiles);
        }
        if parent_depth >= self.max_depth {
            return reject(&mut state, id, RejectReason::MaxDepth);
        }

        let depth = parent_depth + 1;
        state.entries.insert(
            id.clone(),
            FrontierEntry {
                depth,
                status: EntryStatus::Queued,
            },
        );
        debug!(identifier = %id, depth, "admitted");
        Decision::Admit(depth)
    }

    /// `Queued → Visited`. No-op for unknown identifiers.
    pub fn mark_visited(&self, id: &PageId) {
        if let Some(entry) = self.lock().entries.get_mut(id) {
            entry.status = EntryStatus::Visited;
        }
    }

    pub fn entry(&self, id: &PageId) -> Option<FrontierEntry> {
        self.lock().entries.get(id).copied()
    }

    pub fn depth_of(&self, id: &PageId) -> Option<u32> {
        self.entry(id).map(|entry| entry.depth)
    }

    pub fn status(&self, id: &PageId) -> Option<EntryStatus> {
        let state = self.lock();
        if let Some(entry) = state.entries.get(id) {
            return Some(entry.status);
        }
        state.rejected.contains(id).then_some(EntryStatus::Rejected)
    }

    /// Budget units consumed so far. Never exceeds `max_files`.
    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::Acquire)
    }

    /// Rejections in the order they happened.
    pub fn snapshot_ledger(&self) -> Vec<LedgerEntry> {
        self.lock().ledger.clone()
    }

    fn take_budget(&self) -> bool {
        let max = self.max_files;
        self.admitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrontierState {
    fn is_known(&self, id: &PageId) -> bool {
        self.entries.contains_key(id) || self.rejected.contains(id)
    }
}

fn reject(state: &mut FrontierState, id: &PageId, reason: RejectReason) -> Decision {
    state.rejected.insert(id.clone());
    state.ledger.push(LedgerEntry {
        identifier: id.clone(),
        reason,
    });
    debug!(identifier = %id, %reason, "rejected");
    Decision::Reject(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn id(raw: &str) -> PageId {
        PageId::new(raw).unwrap()
    }

    #[test]
    fn budget_of_one_rejects_after_seed() {
        let frontier = Frontier::new(1, 10);
        assert_eq!(frontier.seed(&id("Arch_Linux")), Decision::Admit(0));
        assert_eq!(
            frontier.discover(&id("X"), 0),
            Decision::Reject(RejectReason::MaxFiles)
        );

        let ledger = frontier.snapshot_ledger();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].identifier.as_str(), "X");
        assert_eq!(ledger[0].reason.as_str(), "max_files_limit");
        assert_eq!(frontier.admitted(), 1);
    }

    #[test]
    fn depth_is_parent_plus_one_and_first_discovery_wins() {
        let frontier = Frontier::new(10, 10);
        frontier.seed(&id("Root"));
        assert_eq!(frontier.discover(&id("A"), 0), Decision::Admit(1));
        assert_eq!(frontier.discover(&id("B"), 1), Decision::Admit(2));
        assert_eq!(frontier.discover(&id("A"), 3), Decision::AlreadyKnown);
        assert_eq!(frontier.depth_of(&id("A")), Some(1));
    }

    #[test]
    fn max_depth_rejection_consumes_budget() {
        let frontier = Frontier::new(3, 1);
        frontier.seed(&id("Root"));
        assert_eq!(frontier.discover(&id("A"), 0), Decision::Admit(1));
        assert_eq!(
            frontier.discover(&id("Deep"), 1),
            Decision::Reject(RejectReason::MaxDepth)
        );
        assert_eq!(frontier.admitted(), 3);
        assert_eq!(
            frontier.discover(&id("B"), 0),
            Decision::Reject(RejectReason::MaxFiles)
        );
        assert_eq!(frontier.admitted(), 3);
    }

    #[test]
    fn rejected_identifiers_are_already_known() {
        let frontier = Frontier::new(1, 10);
        frontier.seed(&id("Root"));
        frontier.discover(&id("X"), 0);
        assert_eq!(frontier.discover(&id("X"), 0), Decision::AlreadyKnown);
        assert_eq!(frontier.snapshot_ledger().len(), 1);
        assert_eq!(frontier.status(&id("X")), Some(EntryStatus::Rejected));
        assert_eq!(frontier.depth_of(&id("X")), None);
    }

    #[test]
    fn zero_budget_rejects_seed() {
        let frontier = Frontier::new(0, 10);
        assert_eq!(
            frontier.seed(&id("Root")),
            Decision::Reject(RejectReason::MaxFiles)
        );
        assert_eq!(frontier.admitted(), 0);
    }

    #[test]
    fn mark_visited_transitions_known_entries_only() {
        let frontier = Frontier::new(10, 10);
        frontier.seed(&id("Root"));
        assert_eq!(frontier.status(&id("Root")), Some(EntryStatus::Queued));
        frontier.mark_visited(&id("Root"));
        assert_eq!(
            frontier.entry(&id("Root")),
            Some(FrontierEntry {
                depth: 0,
                status: EntryStatus::Visited
            })
        );

        frontier.mark_visited(&id("Ghost"));
        assert_eq!(frontier.status(&id("Ghost")), None);
    }

    #[test]
    fn concurrent_discovery_respects_budget() {
        let frontier = Arc::new(Frontier::new(50, 100));
        frontier.seed(&id("Root"));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let frontier = Arc::clone(&frontier);
                thread::spawn(move || {
                    let mut admitted = Vec::new();
                    // Overlapping ranges so workers race on the same ids.
                    for n in (worker * 20)..(worker * 20 + 60) {
                        let page = id(&format!("Page_{n}"));
                        if let Decision::Admit(_) = frontier.discover(&page, 0) {
                            admitted.push(page);
                        }
                    }
                    admitted
                })
            })
            .collect();

        let mut admitted = HashSet::new();
        for handle in handles {
            for page in handle.join().unwrap() {
                assert!(admitted.insert(page), "identifier admitted twice");
            }
        }

        assert_eq!(frontier.admitted(), 50);
        assert_eq!(admitted.len(), 49);

        let ledger = frontier.snapshot_ledger();
        for entry in &ledger {
            assert!(!admitted.contains(&entry.identifier));
            assert_eq!(entry.reason, RejectReason::MaxFiles);
        }
        // Pages 0..200 were all offered at least once.
        assert_eq!(admitted.len() + ledger.len(), 200);
    }
}
