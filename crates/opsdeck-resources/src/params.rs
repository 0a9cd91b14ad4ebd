//! Query-string rendering shared by the resources

use crate::client::QueryPairs;
use opsdeck_query::{FilterField, FilterSet};
use serde::{Deserialize, Serialize};

/// Render the filters a resource understands
///
/// `name` maps a field to the resource's parameter name; fields it maps to
/// `None` are not sent. Dates are rendered as RFC 3339 UTC with milliseconds.
pub(crate) fn filter_pairs(
    filters: &FilterSet,
    name: impl Fn(FilterField) -> Option<&'static str>,
) -> QueryPairs {
    filters
        .iter()
        .filter_map(|(field, value)| name(field).map(|key| (key, value.to_query_value())))
        .collect()
}

/// `pagination` block of the page-numbered endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationInfo {
    /// 1-based page
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Matching records
    pub total: u64,
    /// `ceil(total / limit)`
    pub total_pages: u32,
    /// A next page exists
    pub has_next: bool,
    /// A previous page exists
    pub has_prev: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_query::FilterValue;

    #[test]
    fn unmapped_fields_are_dropped_and_dates_rendered() {
        let filters = FilterSet::new()
            .with(FilterField::Search, "acme")
            .with(FilterField::Channel, "whatsapp")
            .with(
                FilterField::StartDate,
                FilterValue::parse(FilterField::StartDate, "2024-03-01"),
            );

        let pairs = filter_pairs(&filters, |field| match field {
            FilterField::Search => Some("search"),
            FilterField::StartDate => Some("startDate"),
            _ => None,
        });

        assert_eq!(
            pairs,
            vec![
                ("search", "acme".to_string()),
                ("startDate", "2024-03-01T00:00:00.000Z".to_string()),
            ]
        );
    }
}
