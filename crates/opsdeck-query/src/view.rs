//! List view controller
//!
//! [`ListView`] composes the draft, the debounce synchronizer, mode selection,
//! the two fetchers, the page cache and the selection registry into the state
//! a dashboard list renders from.
//!
//! The view owns every piece of asynchronous work it starts: outstanding
//! fetches live in a [`FuturesUnordered`] and the debounce timer is an owned
//! sleep. Nothing is spawned, so dropping the view (or calling
//! [`ListView::unmount`]) cancels all of it and no late response can touch
//! state afterwards. Progress happens only while the owner awaits
//! [`ListView::next_event`] or [`ListView::settle`].
//!
//! Responses are matched against the current query when they land. A
//! paginated response whose [`PageKey`] is no longer current, or a stream
//! response from an older generation, is discarded and counted in
//! [`ListView::stale_discards`].

use crate::cache::{PageCache, Provenance};
use crate::config::ListViewConfig;
use crate::debounce::DebounceSynchronizer;
use crate::error::{FetchError, QueryError};
use crate::filter::{FilterDraft, FilterField, FilterSet, FilterValue};
use crate::infinite::{InfiniteFetcher, PageTicket, StreamControls, StreamResolution};
use crate::mode::{select_mode, FetchMode};
use crate::page::{Page, Record, RecordId};
use crate::paginated::{PaginatedFetcher, PaginationControls, Resolution};
use crate::query_key::{PageKey, QueryKey};
use crate::selection::SelectionSet;
use crate::sort::SortSpec;
use crate::source::PageSource;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;

/// Something observable that happened while the view made progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Filters were committed and the list restarted in `mode`
    Committed(FetchMode),
    /// A page became visible
    Loaded {
        /// 1-based page number
        page: u32,
        /// Cache or network
        provenance: Provenance,
    },
    /// A stream page arrived early and is waiting for its predecessor
    Held {
        /// 1-based page number
        page: u32,
    },
    /// A request for the current query failed
    Failed {
        /// 1-based page number
        page: u32,
        /// What went wrong
        error: FetchError,
    },
    /// A response for a superseded query was dropped
    Discarded {
        /// 1-based page number
        page: u32,
    },
}

/// Navigation chrome for whichever mode is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListControls {
    /// Numbered pages
    Paginated(PaginationControls),
    /// Load-more stream
    Infinite(StreamControls),
}

#[derive(Debug)]
enum Feed<T, S> {
    Paginated(PaginatedFetcher<T, S>),
    Infinite(InfiniteFetcher<T, S>),
}

enum Completion<T, S> {
    Page {
        key: PageKey,
        epoch: u64,
        result: Result<(Arc<Page<T, S>>, Provenance), FetchError>,
    },
    Stream {
        ticket: PageTicket,
        result: Result<Page<T, S>, FetchError>,
    },
}

enum Wake<T, S> {
    Fetched(Completion<T, S>),
    Debounced(FilterSet),
    Idle,
}

/// One dashboard list bound to a page source
pub struct ListView<P: PageSource> {
    source: Arc<P>,
    config: ListViewConfig,
    draft: FilterDraft,
    committed: FilterSet,
    sort: SortSpec,
    limit: u32,
    debounce: DebounceSynchronizer,
    cache: PageCache<P::Record, P::Stats>,
    feed: Feed<P::Record, P::Stats>,
    selection: SelectionSet,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion<P::Record, P::Stats>>>,
    pages_in_flight: HashSet<PageKey>,
    generation: u64,
    mounted: bool,
    stale_discards: u64,
}

impl<P: PageSource> ListView<P> {
    /// Create an unmounted view with no filters
    ///
    /// Nothing is fetched until [`ListView::mount`].
    pub fn new(source: Arc<P>, config: ListViewConfig) -> Result<Self, QueryError> {
        config.validate()?;

        let sort = config.default_sort.clone();
        let limit = config.page_size;
        let committed = FilterSet::new();
        let generation = 1;
        let feed = Self::feed_for(QueryKey::new(committed.clone(), sort.clone(), limit), generation);

        Ok(Self {
            debounce: DebounceSynchronizer::new(config.debounce()),
            cache: PageCache::with_freshness(config.cache_capacity, config.freshness()),
            source,
            draft: FilterDraft::new(),
            committed,
            sort,
            limit,
            feed,
            selection: SelectionSet::new(),
            in_flight: FuturesUnordered::new(),
            pages_in_flight: HashSet::new(),
            generation,
            mounted: false,
            stale_discards: 0,
            config,
        })
    }

    /// Start fetching the first page
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        tracing::debug!(resource = self.source.name(), mode = %self.mode(), "list view mounted");
        self.kick();
    }

    /// Tear down: cancel the debounce timer and drop outstanding requests
    pub fn unmount(mut self) {
        let debounce_pending = self.debounce.cancel();
        tracing::debug!(
            resource = self.source.name(),
            outstanding = self.in_flight.len(),
            debounce_pending,
            "list view unmounted"
        );
    }

    // ----- rendering -----

    /// Records to render, in server order
    #[must_use]
    pub fn records(&self) -> &[P::Record] {
        match &self.feed {
            Feed::Paginated(fetcher) => fetcher.records(),
            Feed::Infinite(fetcher) => fetcher.records(),
        }
    }

    /// Ids of the rendered records
    #[must_use]
    pub fn visible_ids(&self) -> Vec<RecordId> {
        self.records().iter().map(Record::record_id).collect()
    }

    /// Initial load of the current page or stream is outstanding
    #[must_use]
    pub fn is_loading(&self) -> bool {
        match &self.feed {
            Feed::Paginated(fetcher) => fetcher.is_loading(),
            Feed::Infinite(fetcher) => fetcher.is_loading(),
        }
    }

    /// A later stream page is outstanding
    #[must_use]
    pub fn is_fetching_more(&self) -> bool {
        match &self.feed {
            Feed::Paginated(_) => false,
            Feed::Infinite(fetcher) => fetcher.is_fetching_more(),
        }
    }

    /// Error of the current query, if its last request failed
    #[must_use]
    pub fn error(&self) -> Option<&FetchError> {
        match &self.feed {
            Feed::Paginated(fetcher) => fetcher.error(),
            Feed::Infinite(fetcher) => fetcher.error(),
        }
    }

    /// Active fetch mode
    #[must_use]
    pub fn mode(&self) -> FetchMode {
        match self.feed {
            Feed::Paginated(_) => FetchMode::Paginated,
            Feed::Infinite(_) => FetchMode::Infinite,
        }
    }

    /// Navigation chrome
    #[must_use]
    pub fn controls(&self) -> ListControls {
        match &self.feed {
            Feed::Paginated(fetcher) => ListControls::Paginated(fetcher.controls()),
            Feed::Infinite(fetcher) => ListControls::Infinite(fetcher.controls()),
        }
    }

    /// Server summary block of the latest page
    #[must_use]
    pub fn stats(&self) -> Option<&P::Stats> {
        match &self.feed {
            Feed::Paginated(fetcher) => fetcher.stats().stats(),
            Feed::Infinite(fetcher) => fetcher.stats().stats(),
        }
    }

    /// Matching-record count reported by the server
    #[must_use]
    pub fn total_matching(&self) -> Option<u64> {
        match &self.feed {
            Feed::Paginated(fetcher) => fetcher.total_matching(),
            Feed::Infinite(fetcher) => fetcher.total_matching(),
        }
    }

    /// Responses dropped because their query had been superseded
    #[inline]
    #[must_use]
    pub fn stale_discards(&self) -> u64 {
        self.stale_discards
    }

    /// Requests currently outstanding
    #[inline]
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.in_flight.len()
    }

    /// Identity of the committed query
    #[must_use]
    pub fn query_key(&self) -> QueryKey {
        QueryKey::new(self.committed.clone(), self.sort.clone(), self.limit)
    }

    /// View configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ListViewConfig {
        &self.config
    }

    // ----- navigation -----

    /// Jump to 1-based `page` (paginated mode only)
    pub fn set_page(&mut self, page: u32) -> Result<(), QueryError> {
        let Feed::Paginated(fetcher) = &mut self.feed else {
            return Err(QueryError::WrongMode {
                required: FetchMode::Paginated.as_str(),
            });
        };
        if let Some(key) = fetcher.set_page(page)? {
            self.issue_page(key);
        }
        Ok(())
    }

    /// Change the page size; restarts from the first page
    pub fn set_page_size(&mut self, page_size: u32) -> Result<(), QueryError> {
        if page_size == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        if page_size != self.limit {
            self.limit = page_size;
            self.restart();
        }
        Ok(())
    }

    /// Request the next stream page; returns whether a request was issued
    ///
    /// A no-op in paginated mode, while a page is outstanding, or once the
    /// stream is exhausted.
    pub fn fetch_next(&mut self) -> bool {
        let Feed::Infinite(fetcher) = &mut self.feed else {
            return false;
        };
        match fetcher.fetch_next() {
            Some(ticket) => {
                self.issue_stream(ticket);
                true
            }
            None => false,
        }
    }

    /// Re-request whatever failed; returns whether a request was issued
    pub fn retry(&mut self) -> bool {
        match &mut self.feed {
            Feed::Paginated(fetcher) => match fetcher.retry() {
                Some(key) => {
                    self.issue_page(key);
                    true
                }
                None => false,
            },
            Feed::Infinite(fetcher) => match fetcher.retry() {
                Some(ticket) => {
                    self.issue_stream(ticket);
                    true
                }
                None => false,
            },
        }
    }

    /// Drop cached pages and reload from the start
    ///
    /// Requests issued before the refresh are not reused; their responses are
    /// discarded when they land.
    pub fn refresh(&mut self) {
        self.cache.invalidate_all();
        self.pages_in_flight.clear();
        self.restart();
    }

    /// Apply a new sort; restarts from the first page
    pub fn set_sort(&mut self, sort: SortSpec) {
        if sort != self.sort {
            self.sort = sort;
            self.restart();
        }
    }

    /// Active sort
    #[inline]
    #[must_use]
    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    /// Records per page
    #[inline]
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.limit
    }

    // ----- filters -----

    /// Edit one draft field and (re)start the debounce timer
    ///
    /// Fields the source does not support are ignored.
    pub fn set_filter_field(&mut self, field: FilterField, value: Option<FilterValue>) {
        if !self.source.supports(field) {
            tracing::warn!(resource = self.source.name(), %field, "filter not supported; ignored");
            return;
        }
        self.draft.set(field, value);
        self.debounce.schedule(self.draft.snapshot());
    }

    /// Commit the draft immediately, cancelling any pending debounce
    pub fn commit_filters(&mut self) -> ViewEvent {
        let filters = self
            .debounce
            .flush()
            .unwrap_or_else(|| self.draft.snapshot());
        self.apply_commit(filters)
    }

    /// Reset the draft to defaults and commit
    pub fn clear_filters(&mut self) -> ViewEvent {
        self.draft.clear();
        self.debounce.cancel();
        self.apply_commit(FilterSet::new())
    }

    /// Uncommitted edits
    #[inline]
    #[must_use]
    pub fn filter_draft(&self) -> &FilterDraft {
        &self.draft
    }

    /// Filters the list is currently showing
    #[inline]
    #[must_use]
    pub fn committed_filters(&self) -> &FilterSet {
        &self.committed
    }

    /// A debounced commit is scheduled
    #[inline]
    #[must_use]
    pub fn commit_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    // ----- selection -----

    /// Selected ids
    #[inline]
    #[must_use]
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Flip selection of one record; returns whether it is now selected
    pub fn toggle(&mut self, id: RecordId) -> bool {
        self.selection.toggle(id)
    }

    /// Select every rendered record, or deselect them if exactly they are selected
    pub fn select_all_visible(&mut self) {
        let visible = self.visible_ids();
        self.selection.select_all_visible(&visible);
    }

    /// Deselect everything
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ----- progress -----

    /// Wait for the next fetch completion or debounced commit and apply it
    ///
    /// Returns `None` when nothing is outstanding. Cancel-safe: dropping the
    /// future loses no completion and leaves the debounce timer armed.
    pub async fn next_event(&mut self) -> Option<ViewEvent> {
        let wake = {
            let fetching = !self.in_flight.is_empty();
            let debouncing = self.debounce.is_pending();
            let in_flight = &mut self.in_flight;
            let debounce = &mut self.debounce;

            tokio::select! {
                biased;
                Some(done) = in_flight.next(), if fetching => Wake::Fetched(done),
                filters = debounce.fired(), if debouncing => Wake::Debounced(filters),
                else => Wake::Idle,
            }
        };

        match wake {
            Wake::Fetched(done) => Some(self.apply(done)),
            Wake::Debounced(filters) => Some(self.apply_commit(filters)),
            Wake::Idle => None,
        }
    }

    /// Drive the view until nothing is outstanding; returns every event
    pub async fn settle(&mut self) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    // ----- internals -----

    fn feed_for(query: QueryKey, generation: u64) -> Feed<P::Record, P::Stats> {
        match select_mode(&query.filters) {
            FetchMode::Paginated => Feed::Paginated(PaginatedFetcher::new(query)),
            FetchMode::Infinite => Feed::Infinite(InfiniteFetcher::new(query, generation)),
        }
    }

    fn apply_commit(&mut self, filters: FilterSet) -> ViewEvent {
        let range = filters.date_range();
        if range.is_inverted() {
            tracing::warn!(
                resource = self.source.name(),
                start = ?range.start,
                end = ?range.end,
                "start date is after end date; passing range through unchanged"
            );
        }

        self.committed = filters;
        self.restart();

        let mode = self.mode();
        tracing::info!(
            resource = self.source.name(),
            %mode,
            filters = self.committed.len(),
            "filters committed"
        );
        ViewEvent::Committed(mode)
    }

    fn restart(&mut self) {
        self.generation += 1;
        self.feed = Self::feed_for(self.query_key(), self.generation);
        if self.mounted {
            self.kick();
        }
    }

    fn kick(&mut self) {
        match &mut self.feed {
            Feed::Paginated(fetcher) => {
                if let Some(key) = fetcher.start() {
                    self.issue_page(key);
                }
            }
            Feed::Infinite(fetcher) => {
                if let Some(ticket) = fetcher.start() {
                    self.issue_stream(ticket);
                }
            }
        }
    }

    fn issue_page(&mut self, key: PageKey) {
        if !self.pages_in_flight.insert(key.clone()) {
            tracing::trace!(page = key.page_number(), "request already in flight");
            return;
        }
        tracing::debug!(
            resource = self.source.name(),
            page = key.page_number(),
            offset = key.offset,
            limit = key.query.limit,
            "fetching page"
        );

        let source = Arc::clone(&self.source);
        let cache = self.cache.clone();
        let epoch = cache.epoch();
        self.in_flight.push(
            async move {
                let result = cache
                    .try_get_or_fetch(&key, || {
                        source.fetch_page(&key.query.filters, &key.query.sort, key.request())
                    })
                    .await;
                Completion::Page { key, epoch, result }
            }
            .boxed(),
        );
    }

    fn issue_stream(&mut self, ticket: PageTicket) {
        let Feed::Infinite(fetcher) = &self.feed else {
            return;
        };
        let query = fetcher.query().clone();
        tracing::debug!(
            resource = self.source.name(),
            generation = ticket.generation,
            page = ticket.page,
            limit = query.limit,
            "fetching stream page"
        );

        let source = Arc::clone(&self.source);
        self.in_flight.push(
            async move {
                let result = source
                    .fetch_page(&query.filters, &query.sort, query.numbered(ticket.page))
                    .await;
                Completion::Stream { ticket, result }
            }
            .boxed(),
        );
    }

    fn apply(&mut self, done: Completion<P::Record, P::Stats>) -> ViewEvent {
        match done {
            Completion::Page { key, epoch, result } => {
                let page = key.page_number();
                if epoch != self.cache.epoch() {
                    return self.discard(page);
                }
                self.pages_in_flight.remove(&key);
                let Feed::Paginated(fetcher) = &mut self.feed else {
                    return self.discard(page);
                };

                let (result, provenance) = match result {
                    Ok((page, from)) => (Ok(page), from),
                    Err(error) => (Err(error), Provenance::Network),
                };
                match fetcher.resolve(&key, result) {
                    Resolution::Applied => ViewEvent::Loaded { page, provenance },
                    Resolution::Superseded => self.discard(page),
                    Resolution::Failed(error) => self.failed(page, error),
                }
            }
            Completion::Stream { ticket, result } => {
                let Feed::Infinite(fetcher) = &mut self.feed else {
                    return self.discard(ticket.page);
                };
                match fetcher.resolve(ticket, result) {
                    StreamResolution::Applied { .. } => ViewEvent::Loaded {
                        page: ticket.page,
                        provenance: Provenance::Network,
                    },
                    StreamResolution::Held => ViewEvent::Held { page: ticket.page },
                    StreamResolution::Stale => self.discard(ticket.page),
                    StreamResolution::Failed(error) => self.failed(ticket.page, error),
                }
            }
        }
    }

    fn discard(&mut self, page: u32) -> ViewEvent {
        self.stale_discards += 1;
        tracing::debug!(resource = self.source.name(), page, "discarded superseded response");
        ViewEvent::Discarded { page }
    }

    fn failed(&self, page: u32, error: FetchError) -> ViewEvent {
        tracing::warn!(resource = self.source.name(), page, %error, "fetch failed");
        ViewEvent::Failed { page, error }
    }
}

impl<P: PageSource> std::fmt::Debug for ListView<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListView")
            .field("resource", &self.source.name())
            .field("mode", &self.mode())
            .field("committed", &self.committed)
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("generation", &self.generation)
            .field("outstanding", &self.in_flight.len())
            .field("selected", &self.selection.len())
            .finish_non_exhaustive()
    }
}
