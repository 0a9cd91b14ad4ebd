//! Infinite fetcher
//!
//! Accumulates numbered pages 1, 2, 3, ... into one flattened list. Every
//! stream has a generation; a query change starts a new fetcher with a higher
//! generation and responses carrying an older one are stale.
//!
//! Pages are appended strictly in page order. A response for page `n + 1`
//! that lands before page `n` is held back until `n` has been applied, so the
//! flattened list is always the in-order concatenation of applied pages.

use crate::error::FetchError;
use crate::page::Page;
use crate::query_key::QueryKey;
use crate::stats::StatsAggregator;
use std::collections::BTreeMap;

/// Lifecycle of one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// Nothing requested yet
    Idle,
    /// Page 1 outstanding
    FetchingFirst,
    /// At least one page applied, more available
    Ready,
    /// Next page outstanding
    FetchingNext,
    /// Last page applied
    Exhausted,
    /// A page failed; retry re-requests it
    Errored,
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: StreamState) -> &'static [StreamState] {
    use StreamState::{Errored, Exhausted, FetchingFirst, FetchingNext, Idle, Ready};
    match from {
        Idle => &[FetchingFirst],
        FetchingFirst | FetchingNext => &[Ready, Exhausted, Errored],
        Ready => &[FetchingNext],
        Exhausted => &[],
        Errored => &[FetchingFirst, FetchingNext],
    }
}

/// Identifies one stream request: which stream and which page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageTicket {
    /// Stream generation the request belongs to
    pub generation: u64,
    /// 1-based page number
    pub page: u32,
}

/// Outcome of feeding a stream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamResolution {
    /// From an older generation or an already-applied page; dropped
    Stale,
    /// Arrived ahead of an earlier page; buffered
    Held,
    /// Appended; `pages` is the number of pages applied by this response
    Applied {
        /// Pages appended, including released held pages
        pages: usize,
    },
    /// Page failed
    Failed(FetchError),
}

/// Stream chrome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamControls {
    /// Another page can be requested
    pub has_next: bool,
    /// Server reported the last page
    pub is_exhausted: bool,
    /// A next page is outstanding
    pub is_fetching_more: bool,
    /// Pages applied so far
    pub pages_loaded: u32,
}

/// State of one accumulating stream
#[derive(Debug, Clone)]
pub struct InfiniteFetcher<T, S> {
    query: QueryKey,
    generation: u64,
    state: StreamState,
    records: Vec<T>,
    pages_loaded: u32,
    has_next: bool,
    held: BTreeMap<u32, Page<T, S>>,
    stats: StatsAggregator<S>,
    error: Option<(u32, FetchError)>,
}

impl<T, S: Clone> InfiniteFetcher<T, S> {
    /// Idle stream for `query`
    #[must_use]
    pub fn new(query: QueryKey, generation: u64) -> Self {
        Self {
            query,
            generation,
            state: StreamState::Idle,
            records: Vec::new(),
            pages_loaded: 0,
            has_next: true,
            held: BTreeMap::new(),
            stats: StatsAggregator::new(),
            error: None,
        }
    }

    /// Query this stream serves
    #[inline]
    #[must_use]
    pub fn query(&self) -> &QueryKey {
        &self.query
    }

    /// Stream generation
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Request page 1; only from `Idle`
    pub fn start(&mut self) -> Option<PageTicket> {
        if self.state != StreamState::Idle {
            return None;
        }
        self.transition(StreamState::FetchingFirst);
        Some(self.ticket(1))
    }

    /// Request the next page
    ///
    /// No-op (returns `None`) while any page is outstanding, after the last
    /// page, or after a failure.
    pub fn fetch_next(&mut self) -> Option<PageTicket> {
        if self.state != StreamState::Ready || !self.has_next {
            return None;
        }
        self.transition(StreamState::FetchingNext);
        Some(self.ticket(self.pages_loaded + 1))
    }

    /// Re-request the page that failed
    pub fn retry(&mut self) -> Option<PageTicket> {
        if self.state != StreamState::Errored {
            return None;
        }
        let (page, _) = self.error.take()?;
        let next = if page == 1 {
            StreamState::FetchingFirst
        } else {
            StreamState::FetchingNext
        };
        self.transition(next);
        Some(self.ticket(page))
    }

    /// Feed the response for `ticket`
    pub fn resolve(
        &mut self,
        ticket: PageTicket,
        result: Result<Page<T, S>, FetchError>,
    ) -> StreamResolution {
        if ticket.generation != self.generation
            || ticket.page <= self.pages_loaded
            || !matches!(
                self.state,
                StreamState::FetchingFirst | StreamState::FetchingNext
            )
        {
            return StreamResolution::Stale;
        }

        let page = match result {
            Ok(page) => page,
            Err(error) => {
                self.held.retain(|&number, _| number < ticket.page);
                self.error = Some((ticket.page, error.clone()));
                self.transition(StreamState::Errored);
                return StreamResolution::Failed(error);
            }
        };

        self.held.insert(ticket.page, page);
        let mut applied = 0;
        while let Some(page) = self.held.remove(&(self.pages_loaded + 1)) {
            self.append(page);
            applied += 1;
            if !self.has_next {
                self.held.clear();
                break;
            }
        }

        if applied == 0 {
            return StreamResolution::Held;
        }

        let next = if self.has_next {
            StreamState::Ready
        } else {
            StreamState::Exhausted
        };
        self.transition(next);
        StreamResolution::Applied { pages: applied }
    }

    /// Flattened records of every applied page, in page order
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Latest server summary block
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &StatsAggregator<S> {
        &self.stats
    }

    /// Matching-record count reported by the latest page
    #[must_use]
    pub fn total_matching(&self) -> Option<u64> {
        self.stats.snapshot().map(|snapshot| snapshot.total_matching)
    }

    /// Error of the failed page
    #[must_use]
    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref().map(|(_, error)| error)
    }

    /// Pages applied so far
    #[inline]
    #[must_use]
    pub fn pages_loaded(&self) -> u32 {
        self.pages_loaded
    }

    /// Page 1 outstanding
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state == StreamState::FetchingFirst
    }

    /// Later page outstanding
    #[inline]
    #[must_use]
    pub fn is_fetching_more(&self) -> bool {
        self.state == StreamState::FetchingNext
    }

    /// Stream chrome
    #[must_use]
    pub fn controls(&self) -> StreamControls {
        StreamControls {
            has_next: self.has_next && self.state != StreamState::Exhausted,
            is_exhausted: self.state == StreamState::Exhausted,
            is_fetching_more: self.is_fetching_more(),
            pages_loaded: self.pages_loaded,
        }
    }

    fn ticket(&self, page: u32) -> PageTicket {
        PageTicket {
            generation: self.generation,
            page,
        }
    }

    fn append(&mut self, page: Page<T, S>) {
        self.pages_loaded += 1;
        self.stats.observe(self.pages_loaded, &page);
        self.has_next = page.has_next;
        self.records.extend(page.records);
    }

    fn transition(&mut self, to: StreamState) {
        debug_assert!(
            allowed_transitions(self.state).contains(&to),
            "illegal stream transition {:?} -> {to:?}",
            self.state
        );
        tracing::trace!(generation = self.generation, from = ?self.state, to = ?to, "stream transition");
        self.state = to;
    }
}
