//! Page source trait: the engine's only view of the remote API
//!
//! One implementation per resource type (logs, transfer requests, registered
//! users). Failures are returned as [`FetchError`] values, never panics, so
//! the engine's error path is always explicit.

use crate::error::FetchError;
use crate::filter::{FilterField, FilterSet};
use crate::page::{Page, PageRequest, Record};
use crate::sort::SortSpec;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Remote resource that serves pages of records
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    /// Row type
    type Record: Record;
    /// Server-computed summary block
    type Stats: Clone + Debug + Send + Sync + 'static;

    /// Resource name used in logs
    fn name(&self) -> &str;

    /// Whether the server narrows results by `field`
    ///
    /// Fields a source does not support never reach the committed filter
    /// set, so they cannot switch the view into paginated mode.
    fn supports(&self, _field: FilterField) -> bool {
        true
    }

    /// Fetch one page
    ///
    /// Ordering and filtering are entirely the server's business; the engine
    /// renders records exactly as returned.
    async fn fetch_page(
        &self,
        filters: &FilterSet,
        sort: &SortSpec,
        request: PageRequest,
    ) -> Result<Page<Self::Record, Self::Stats>, FetchError>;
}

#[async_trait]
impl<P: PageSource> PageSource for Arc<P> {
    type Record = P::Record;
    type Stats = P::Stats;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn supports(&self, field: FilterField) -> bool {
        (**self).supports(field)
    }

    async fn fetch_page(
        &self,
        filters: &FilterSet,
        sort: &SortSpec,
        request: PageRequest,
    ) -> Result<Page<Self::Record, Self::Stats>, FetchError> {
        (**self).fetch_page(filters, sort, request).await
    }
}
