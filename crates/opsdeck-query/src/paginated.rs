//! Paginated fetcher
//!
//! Holds the state of a numbered-page view for one [`QueryKey`]: which page is
//! current, whether it is loading, the page it shows and the summary block of
//! the last page that loaded.
//! The fetcher is sans-IO. The list view issues the requests it asks for and
//! feeds the responses back through [`PaginatedFetcher::resolve`]; a response
//! whose key no longer matches the current page is reported as superseded and
//! never touches the visible state.

use crate::error::{FetchError, QueryError};
use crate::page::Page;
use crate::query_key::{PageKey, QueryKey};
use crate::stats::StatsAggregator;
use std::sync::Arc;

/// What the current page is doing
#[derive(Debug, Clone)]
pub enum PageState<T, S> {
    /// Nothing requested yet (view not mounted)
    Idle,
    /// Request for the current page outstanding
    Loading,
    /// Current page available
    Ready(Arc<Page<T, S>>),
    /// Current page failed; a retry re-requests the same key
    Failed(FetchError),
}

/// Outcome of feeding a response to the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Response became the visible page
    Applied,
    /// Error recorded for the visible page
    Failed(FetchError),
    /// Response was for a different key and was dropped
    Superseded,
}

/// Navigation chrome for numbered pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationControls {
    /// 1-based current page
    pub current_page: u32,
    /// `ceil(total / page_size)`, zero until a total is known
    pub total_pages: u32,
    /// A previous page exists
    pub has_prev: bool,
    /// A next page exists
    pub has_next: bool,
    /// Records per page
    pub page_size: u32,
}

/// State of a numbered-page view
#[derive(Debug, Clone)]
pub struct PaginatedFetcher<T, S> {
    query: QueryKey,
    current_page: u32,
    state: PageState<T, S>,
    stats: StatsAggregator<S>,
}

impl<T, S: Clone> PaginatedFetcher<T, S> {
    /// Idle fetcher for `query`, positioned on page 1
    #[must_use]
    pub fn new(query: QueryKey) -> Self {
        Self {
            query,
            current_page: 1,
            state: PageState::Idle,
            stats: StatsAggregator::new(),
        }
    }

    /// Request the current page; only from `Idle`
    pub fn start(&mut self) -> Option<PageKey> {
        if !matches!(self.state, PageState::Idle) {
            return None;
        }
        self.state = PageState::Loading;
        Some(self.current_key())
    }

    /// Query this fetcher serves
    #[inline]
    #[must_use]
    pub fn query(&self) -> &QueryKey {
        &self.query
    }

    /// 1-based current page
    #[inline]
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Key of the current page
    #[inline]
    #[must_use]
    pub fn current_key(&self) -> PageKey {
        self.query.page(self.current_page)
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &PageState<T, S> {
        &self.state
    }

    /// Move to page `page`
    ///
    /// Returns the key that now needs fetching, or `None` when `page` is
    /// already shown or nothing has been started yet (the position is kept
    /// for [`start`](Self::start)). Page numbers are not clamped to the known
    /// total: the server answers out-of-range pages with an empty page.
    pub fn set_page(&mut self, page: u32) -> Result<Option<PageKey>, QueryError> {
        if page == 0 {
            return Err(QueryError::InvalidPage(page));
        }
        if matches!(self.state, PageState::Idle) {
            self.current_page = page;
            return Ok(None);
        }
        if page == self.current_page && matches!(self.state, PageState::Ready(_)) {
            return Ok(None);
        }

        self.current_page = page;
        self.state = PageState::Loading;
        Ok(Some(self.current_key()))
    }

    /// Feed the response for `key`
    pub fn resolve(
        &mut self,
        key: &PageKey,
        result: Result<Arc<Page<T, S>>, FetchError>,
    ) -> Resolution {
        if *key != self.current_key() {
            return Resolution::Superseded;
        }

        match result {
            Ok(page) => {
                self.stats.observe(self.current_page, &page);
                self.state = PageState::Ready(page);
                Resolution::Applied
            }
            Err(error) => {
                self.state = PageState::Failed(error.clone());
                Resolution::Failed(error)
            }
        }
    }

    /// Re-request the current page after a failure
    pub fn retry(&mut self) -> Option<PageKey> {
        if !matches!(self.state, PageState::Failed(_)) {
            return None;
        }
        self.state = PageState::Loading;
        Some(self.current_key())
    }

    /// Visible page, if loaded
    #[must_use]
    pub fn page(&self) -> Option<&Arc<Page<T, S>>> {
        match &self.state {
            PageState::Ready(page) => Some(page),
            PageState::Idle | PageState::Loading | PageState::Failed(_) => None,
        }
    }

    /// Visible records
    #[must_use]
    pub fn records(&self) -> &[T] {
        self.page().map_or(&[], |page| page.records.as_slice())
    }

    /// Error of the current page
    #[must_use]
    pub fn error(&self) -> Option<&FetchError> {
        match &self.state {
            PageState::Failed(error) => Some(error),
            PageState::Idle | PageState::Loading | PageState::Ready(_) => None,
        }
    }

    /// Current page is loading
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.state, PageState::Loading)
    }

    /// Summary block of the last page that loaded
    ///
    /// Kept while the next page loads or after it fails so summary cards do
    /// not flicker.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &StatsAggregator<S> {
        &self.stats
    }

    /// Matching-record count of the last loaded page
    #[must_use]
    pub fn total_matching(&self) -> Option<u64> {
        self.stats.snapshot().map(|snapshot| snapshot.total_matching)
    }

    /// `ceil(total / page_size)`
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        let total = self.total_matching().unwrap_or(0);
        let pages = total.div_ceil(u64::from(self.query.limit.max(1)));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Navigation chrome
    #[must_use]
    pub fn controls(&self) -> PaginationControls {
        let total_pages = self.total_pages();
        let has_next = match self.page() {
            Some(page) => page.has_next,
            None => self.current_page < total_pages,
        };

        PaginationControls {
            current_page: self.current_page,
            total_pages,
            has_prev: self.current_page > 1,
            has_next,
            page_size: self.query.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterField, FilterSet};
    use crate::sort::SortSpec;

    fn idle(limit: u32) -> PaginatedFetcher<u32, u64> {
        PaginatedFetcher::new(QueryKey::new(
            FilterSet::new().with(FilterField::Search, "acme"),
            SortSpec::default(),
            limit,
        ))
    }

    fn fetcher(limit: u32) -> PaginatedFetcher<u32, u64> {
        let mut fetcher = idle(limit);
        fetcher.start().unwrap();
        fetcher
    }

    fn page(records: Vec<u32>, total: u64, has_next: bool) -> Arc<Page<u32, u64>> {
        Arc::new(Page::new(records, total, has_next, total * 100))
    }

    #[test]
    fn first_page_then_navigate() {
        let mut fetcher = fetcher(10);
        let first = fetcher.current_key();
        assert_eq!(first.offset, 0);
        assert!(fetcher.is_loading());

        let outcome = fetcher.resolve(&first, Ok(page((0..10).collect(), 37, true)));
        assert_eq!(outcome, Resolution::Applied);
        assert_eq!(fetcher.records().len(), 10);

        let controls = fetcher.controls();
        assert_eq!(controls.total_pages, 4);
        assert!(!controls.has_prev);
        assert!(controls.has_next);

        let second = fetcher.set_page(2).unwrap().unwrap();
        assert_eq!(second.offset, 10);
        assert_eq!(fetcher.current_page(), 2);
        assert!(fetcher.is_loading());
        assert_eq!(fetcher.total_matching(), Some(37));
    }

    #[test]
    fn superseded_response_is_ignored() {
        let mut fetcher = fetcher(10);
        let first = fetcher.current_key();
        let third = fetcher.set_page(3).unwrap().unwrap();

        assert_eq!(
            fetcher.resolve(&first, Ok(page(vec![1], 37, true))),
            Resolution::Superseded
        );
        assert!(fetcher.is_loading());

        assert_eq!(
            fetcher.resolve(&third, Ok(page(vec![21], 37, true))),
            Resolution::Applied
        );
        assert_eq!(fetcher.records(), &[21]);
    }

    #[test]
    fn failure_then_retry_same_key() {
        let mut fetcher = fetcher(10);
        let first = fetcher.current_key();

        let reset = FetchError::Network("reset".into());
        let outcome = fetcher.resolve(&first, Err(reset.clone()));
        assert_eq!(outcome, Resolution::Failed(reset));
        assert!(fetcher.error().is_some());

        assert_eq!(fetcher.retry(), Some(first));
        assert!(fetcher.error().is_none());
        assert_eq!(fetcher.retry(), None);
    }

    #[test]
    fn same_page_is_noop_once_loaded() {
        let mut fetcher = fetcher(10);
        let first = fetcher.current_key();
        fetcher.resolve(&first, Ok(page(vec![1], 1, false)));

        assert_eq!(fetcher.set_page(1).unwrap(), None);
        assert_eq!(fetcher.set_page(0), Err(QueryError::InvalidPage(0)));
    }

    #[test]
    fn empty_result_has_no_pages() {
        let mut fetcher = fetcher(20);
        let first = fetcher.current_key();
        fetcher.resolve(&first, Ok(page(vec![], 0, false)));

        let controls = fetcher.controls();
        assert_eq!(controls.total_pages, 0);
        assert!(!controls.has_next);
        assert!(fetcher.records().is_empty());
    }

    #[test]
    fn idle_until_started() {
        let mut fetcher = idle(10);
        assert!(!fetcher.is_loading());

        assert_eq!(fetcher.set_page(3).unwrap(), None);
        assert!(!fetcher.is_loading());
        assert_eq!(fetcher.current_page(), 3);

        let key = fetcher.start().unwrap();
        assert_eq!(key.offset, 20);
        assert!(fetcher.is_loading());
        assert_eq!(fetcher.start(), None);
    }

    #[test]
    fn stats_survive_navigation_and_failure() {
        let mut fetcher = fetcher(10);
        let first = fetcher.current_key();
        fetcher.resolve(&first, Ok(page((0..10).collect(), 23, true)));
        assert_eq!(fetcher.stats().stats(), Some(&2300));

        let second = fetcher.set_page(2).unwrap().unwrap();
        assert!(fetcher.page().is_none());
        assert_eq!(fetcher.stats().stats(), Some(&2300));

        fetcher.resolve(&second, Err(FetchError::Network("reset".into())));
        assert_eq!(fetcher.stats().stats(), Some(&2300));
        assert_eq!(fetcher.stats().snapshot().map(|s| s.page), Some(1));
        assert_eq!(fetcher.total_matching(), Some(23));
    }
}
