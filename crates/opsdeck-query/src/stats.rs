//! Summary statistics
//!
//! Summary numbers (totals, per-status counts, monetary sums) come from the
//! server-computed block of the latest page. They are never recomputed from the
//! records the client happens to hold: in infinite mode that is only a prefix
//! of the matching set and a local sum would under-report.

use crate::page::Page;

/// Authoritative summary block of the latest page
#[inline]
#[must_use]
pub fn extract_stats<T, S>(latest: &Page<T, S>) -> &S {
    &latest.stats
}

/// Current summary snapshot together with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot<S> {
    /// Server summary block
    pub stats: S,
    /// Matching-record count reported alongside it
    pub total_matching: u64,
    /// 1-based page number the block arrived with
    pub page: u32,
}

/// Keeps exactly one summary block: the most recently observed page's
///
/// Earlier blocks are discarded as soon as a newer page arrives.
#[derive(Debug, Clone)]
pub struct StatsAggregator<S> {
    current: Option<StatsSnapshot<S>>,
}

impl<S: Clone> StatsAggregator<S> {
    /// Empty aggregator
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Replace the current snapshot with `page`'s block
    pub fn observe<T>(&mut self, page_number: u32, page: &Page<T, S>) {
        self.current = Some(StatsSnapshot {
            stats: extract_stats(page).clone(),
            total_matching: page.total_matching,
            page: page_number,
        });
    }

    /// Current summary block
    #[inline]
    #[must_use]
    pub fn stats(&self) -> Option<&S> {
        self.current.as_ref().map(|snapshot| &snapshot.stats)
    }

    /// Current snapshot with provenance
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Option<&StatsSnapshot<S>> {
        self.current.as_ref()
    }
}

impl<S: Clone> Default for StatsAggregator<S> {
    fn default() -> Self {
        Self::new()
    }
}
