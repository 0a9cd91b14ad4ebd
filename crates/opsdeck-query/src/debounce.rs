//! Debounce synchronizer
//!
//! Turns a burst of filter edits into one commit. There is a single pending
//! timer for the whole draft (not one per field): every edit cancels it and
//! starts a new one, and when it fires the latest draft snapshot is committed.
//! Dropping the synchronizer drops the timer, so nothing is committed after
//! teardown.

use crate::filter::FilterSet;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Sleep};

/// Default quiet period before a commit
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct PendingCommit {
    timer: Pin<Box<Sleep>>,
    snapshot: FilterSet,
}

/// Coalesces filter edits into commits
#[derive(Debug)]
pub struct DebounceSynchronizer {
    delay: Duration,
    pending: Option<PendingCommit>,
}

impl DebounceSynchronizer {
    /// Synchronizer with quiet period `delay`
    #[inline]
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Quiet period
    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the timer with the latest draft snapshot
    pub fn schedule(&mut self, snapshot: FilterSet) {
        let restarted = self.pending.is_some();
        self.pending = Some(PendingCommit {
            timer: Box::pin(sleep(self.delay)),
            snapshot,
        });
        tracing::trace!(restarted, delay_ms = self.delay.as_millis(), "debounce timer armed");
    }

    /// Cancel the pending timer without committing; returns whether one was pending
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Take the pending snapshot immediately (explicit "Search" button)
    pub fn flush(&mut self) -> Option<FilterSet> {
        self.pending.take().map(|pending| pending.snapshot)
    }

    /// Whether a commit is scheduled
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for the pending timer and return the committed snapshot
    ///
    /// Never resolves while nothing is scheduled. Cancel-safe: dropping the
    /// future before it resolves leaves the pending commit in place.
    pub async fn fired(&mut self) -> FilterSet {
        match self.pending.as_mut() {
            Some(pending) => pending.timer.as_mut().await,
            None => std::future::pending::<()>().await,
        }
        self.pending
            .take()
            .map(|pending| pending.snapshot)
            .unwrap_or_default()
    }
}

impl Default for DebounceSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
