//! Per-view configuration

use crate::error::QueryError;
use crate::sort::SortSpec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// List view configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListViewConfig {
    /// Records per page (paginated) or per stream chunk (infinite)
    pub page_size: u32,
    /// Quiet period before filter edits are committed, in milliseconds
    pub debounce_ms: u64,
    /// How long a fetched page may be served from cache, in seconds
    pub freshness_secs: u64,
    /// Maximum number of cached pages
    pub cache_capacity: u64,
    /// Sort applied when the view is created
    pub default_sort: SortSpec,
}

impl ListViewConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With page size
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// With debounce delay
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With freshness window
    #[inline]
    #[must_use]
    pub fn with_freshness(mut self, window: Duration) -> Self {
        self.freshness_secs = window.as_secs();
        self
    }

    /// With default sort
    #[inline]
    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.default_sort = sort;
        self
    }

    /// Debounce delay
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Freshness window
    #[inline]
    #[must_use]
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.page_size == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        Ok(())
    }
}

impl Default for ListViewConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            debounce_ms: 500,
            freshness_secs: 300,
            cache_capacity: 256,
            default_sort: SortSpec::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_behaviour() {
        let config = ListViewConfig::default();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.freshness(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = ListViewConfig::new().with_page_size(0);
        assert_eq!(config.validate(), Err(QueryError::InvalidPageSize));
    }
}
