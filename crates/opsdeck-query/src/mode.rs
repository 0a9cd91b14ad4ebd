//! Fetch mode selection
//!
//! Unfiltered "firehose" views stream incrementally; any active constraint
//! switches to numbered pages with exact counts and page jumps.

use crate::filter::FilterSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a list view fetches its records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Discrete offset/limit pages with an exact total
    Paginated,
    /// Page-by-page accumulation from page 1
    Infinite,
}

impl FetchMode {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paginated => "paginated",
            Self::Infinite => "infinite",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infinite iff every constrainable field is unset
#[inline]
#[must_use]
pub fn select_mode(filters: &FilterSet) -> FetchMode {
    if filters.is_unconstrained() {
        FetchMode::Infinite
    } else {
        FetchMode::Paginated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterField, FilterValue};

    #[test]
    fn empty_filters_stream() {
        assert_eq!(select_mode(&FilterSet::new()), FetchMode::Infinite);
    }

    #[test]
    fn default_status_still_streams() {
        let filters = FilterSet::new().with(FilterField::Status, "all");
        assert_eq!(select_mode(&filters), FetchMode::Infinite);
    }

    #[test]
    fn any_single_constraint_paginates() {
        for field in FilterField::ALL {
            let value = FilterValue::parse(field, "2024-01-01");
            let filters = FilterSet::new().with(field, value);
            assert_eq!(select_mode(&filters), FetchMode::Paginated, "field {field}");
        }
    }
}
