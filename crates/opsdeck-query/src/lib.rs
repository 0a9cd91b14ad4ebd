//! Opsdeck Query - adaptive list-query engine
//!
//! Drives the record lists of an operations dashboard (activity logs,
//! transfer requests, registered users):
//! - Filter drafts committed through a single debounce timer
//! - Mode selection: unfiltered views stream, filtered views paginate
//! - Paginated fetching with a freshness cache and exact totals
//! - Infinite fetching with ordered page accumulation
//! - Stale-response discard keyed on query identity
//! - Identity-based selection that survives paging and refetches
//! - Server-computed summary statistics
//!
//! # Example
//!
//! ```rust,ignore
//! use opsdeck_query::prelude::*;
//!
//! # async fn example(source: std::sync::Arc<impl PageSource>) -> Result<(), QueryError> {
//! let mut view = ListView::new(source, ListViewConfig::default())?;
//! view.mount();
//! view.settle().await;
//!
//! view.set_filter_field(FilterField::Search, Some("acme".into()));
//! view.settle().await; // debounced commit, then page 1
//! assert_eq!(view.mode(), FetchMode::Paginated);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod infinite;
pub mod mode;
pub mod page;
pub mod paginated;
pub mod query_key;
pub mod selection;
pub mod sort;
pub mod source;
pub mod stats;
pub mod view;

pub use cache::{PageCache, Provenance};
pub use config::ListViewConfig;
pub use debounce::{DebounceSynchronizer, DEFAULT_DEBOUNCE};
pub use error::{FetchError, QueryError};
pub use filter::{
    DateRange, FilterDraft, FilterField, FilterSet, FilterValue, UnknownFilterField,
    DEFAULT_STATUS,
};
pub use infinite::{InfiniteFetcher, PageTicket, StreamControls, StreamResolution, StreamState};
pub use mode::{select_mode, FetchMode};
pub use page::{Page, PageRequest, Record, RecordId};
pub use paginated::{PageState, PaginatedFetcher, PaginationControls, Resolution};
pub use query_key::{PageKey, QueryKey};
pub use selection::SelectionSet;
pub use sort::{SortDirection, SortSpec};
pub use source::PageSource;
pub use stats::{extract_stats, StatsAggregator, StatsSnapshot};
pub use view::{ListControls, ListView, ViewEvent};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a list view
    pub use crate::{
        FetchError, FetchMode, FilterField, FilterSet, FilterValue, ListControls, ListView,
        ListViewConfig, Page, PageRequest, PageSource, QueryError, Record, RecordId, SortSpec,
        ViewEvent,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
