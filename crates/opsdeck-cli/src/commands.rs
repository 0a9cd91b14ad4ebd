//! Command runners
//!
//! A list command drives one [`ListView`] the way the dashboard would:
//! filters are typed into the draft and committed, the view is mounted and
//! settled, then navigated to the requested page or drained.

use crate::config::ConfigError;
use opsdeck_query::{
    FetchError, FetchMode, FilterField, FilterValue, ListControls, ListView, ListViewConfig,
    PageSource, QueryError, SortDirection, SortSpec,
};
use std::sync::Arc;
use thiserror::Error;

/// Errors from running a command
#[derive(Debug, Error)]
pub enum CommandError {
    /// Invalid list operation
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Request failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Filter the resource cannot narrow by
    #[error("{resource} cannot be filtered by {field}")]
    UnsupportedFilter {
        /// Resource name
        resource: String,
        /// Offending filter
        field: FilterField,
    },

    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Output could not be written
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be serialized
    #[error("json output error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options of the list subcommands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Free-text search
    pub search: Option<String>,
    /// Status filter
    pub status: Option<String>,
    /// Channel filter
    pub channel: Option<String>,
    /// Start date (`YYYY-MM-DD` or RFC 3339)
    pub from: Option<String>,
    /// End date (`YYYY-MM-DD` or RFC 3339)
    pub to: Option<String>,
    /// 1-based page (paginated mode)
    pub page: u32,
    /// Page size override
    pub limit: Option<u32>,
    /// Sort field override
    pub sort: Option<String>,
    /// Ascending instead of descending
    pub ascending: bool,
    /// Drain the stream in infinite mode
    pub all: bool,
}

impl ListOptions {
    /// Filter edits to type into the draft
    #[must_use]
    pub fn filter_edits(&self) -> Vec<(FilterField, FilterValue)> {
        [
            (FilterField::Search, &self.search),
            (FilterField::Status, &self.status),
            (FilterField::Channel, &self.channel),
            (FilterField::StartDate, &self.from),
            (FilterField::EndDate, &self.to),
        ]
        .into_iter()
        .filter_map(|(field, raw)| {
            raw.as_deref()
                .map(|raw| (field, FilterValue::parse(field, raw)))
        })
        .collect()
    }

    fn sort_spec(&self, default: &SortSpec) -> SortSpec {
        let field = self.sort.clone().unwrap_or_else(|| default.field.clone());
        let direction = if self.ascending {
            SortDirection::Ascending
        } else if self.sort.is_some() {
            SortDirection::Descending
        } else {
            default.direction
        };
        SortSpec::new(field, direction)
    }
}

/// What a list command produced
#[derive(Debug, Clone)]
pub struct Listing<R, S> {
    /// Records in server order
    pub records: Vec<R>,
    /// Latest summary block
    pub stats: Option<S>,
    /// Matching-record count
    pub total_matching: Option<u64>,
    /// Mode the engine chose
    pub mode: FetchMode,
    /// Navigation state after the command
    pub controls: ListControls,
}

/// Run a list command against `source`
pub async fn collect<P: PageSource>(
    source: Arc<P>,
    config: ListViewConfig,
    options: &ListOptions,
) -> Result<Listing<P::Record, P::Stats>, CommandError> {
    let config = match options.limit {
        Some(limit) => config.with_page_size(limit),
        None => config,
    };
    let sort = options.sort_spec(&config.default_sort);
    let edits = options.filter_edits();
    if let Some((field, _)) = edits.iter().find(|(field, _)| !source.supports(*field)) {
        return Err(CommandError::UnsupportedFilter {
            resource: source.name().to_string(),
            field: *field,
        });
    }

    let mut view = ListView::new(source, config)?;
    view.set_sort(sort);
    for (field, value) in edits {
        view.set_filter_field(field, Some(value));
    }
    let committed = view.commit_filters();
    tracing::debug!(?committed, filters = view.committed_filters().len(), "list command committed");

    view.mount();
    settle(&mut view).await?;

    match view.mode() {
        FetchMode::Paginated => {
            if options.page > 1 {
                view.set_page(options.page)?;
                settle(&mut view).await?;
            }
        }
        FetchMode::Infinite => {
            if options.page > 1 {
                tracing::warn!(page = options.page, "unfiltered lists stream; --page ignored");
            }
            if options.all {
                while view.fetch_next() {
                    settle(&mut view).await?;
                }
            }
        }
    }

    let listing = Listing {
        records: view.records().to_vec(),
        stats: view.stats().cloned(),
        total_matching: view.total_matching(),
        mode: view.mode(),
        controls: view.controls(),
    };
    view.unmount();
    Ok(listing)
}

async fn settle<P: PageSource>(view: &mut ListView<P>) -> Result<(), CommandError> {
    view.settle().await;
    match view.error() {
        Some(error) => Err(error.clone().into()),
        None => Ok(()),
    }
}
