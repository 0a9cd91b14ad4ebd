//! Activity log resource (`GET /logs`)
//!
//! Offset-addressed: both fetch modes send `limit`/`offset`; the stream's page
//! numbers are converted to offsets.

use crate::client::{ApiClient, QueryPairs};
use crate::params::filter_pairs;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsdeck_query::{
    FetchError, FilterField, FilterSet, Page, PageRequest, PageSource, Record, RecordId, SortSpec,
};
use serde::{Deserialize, Serialize};

/// One activity log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Database id
    #[serde(rename = "_id")]
    pub id: String,
    /// Entry type (`received_message`, `change_status`, `bot_action`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// CRM contact id
    #[serde(default)]
    pub contact_id: Option<String>,
    /// CRM lead id
    #[serde(default)]
    pub lead_id: Option<String>,
    /// Contact display name
    #[serde(default)]
    pub user_name: Option<String>,
    /// Message body for message entries
    #[serde(default)]
    pub message_text: Option<String>,
    /// Previous status for status changes
    #[serde(default)]
    pub old_status: Option<String>,
    /// New status for status changes
    #[serde(default)]
    pub new_status: Option<String>,
    /// `bot`, `manual` or `system`
    #[serde(default)]
    pub changed_by: Option<String>,
    /// Type-specific fields not modelled above
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl Record for LogEntry {
    fn record_id(&self) -> RecordId {
        RecordId::new(self.id.clone())
    }
}

/// Log summary block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogStats {
    /// Messages received in the matching set
    pub received_messages: u64,
    /// Status changes in the matching set
    pub change_status: u64,
    /// Bot actions in the matching set
    pub bot_actions: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogsResponse {
    #[serde(default)]
    logs: Vec<LogEntry>,
    #[serde(default)]
    total: u64,
    has_more: Option<bool>,
    #[serde(default)]
    stats: LogStats,
}

fn param_name(field: FilterField) -> Option<&'static str> {
    match field {
        FilterField::Search => Some("searchTerm"),
        FilterField::Channel => None,
        other => Some(other.as_str()),
    }
}

/// Activity logs
#[derive(Debug, Clone)]
pub struct LogsSource {
    client: ApiClient,
}

impl LogsSource {
    /// Source over `client`
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Newest entries first, by event time
    #[must_use]
    pub fn default_sort() -> SortSpec {
        SortSpec::descending("timestamp")
    }
}

#[async_trait]
impl PageSource for LogsSource {
    type Record = LogEntry;
    type Stats = LogStats;

    fn name(&self) -> &str {
        "logs"
    }

    fn supports(&self, field: FilterField) -> bool {
        param_name(field).is_some()
    }

    async fn fetch_page(
        &self,
        filters: &FilterSet,
        sort: &SortSpec,
        request: PageRequest,
    ) -> Result<Page<LogEntry, LogStats>, FetchError> {
        let offset = request.offset();
        let mut query: QueryPairs = vec![
            ("limit", request.limit().to_string()),
            ("offset", offset.to_string()),
            ("sortBy", sort.field.clone()),
            ("sortOrder", sort.direction.as_str().to_string()),
        ];
        query.extend(filter_pairs(filters, param_name));

        let response: LogsResponse = self.client.get_json("/logs", &query).await?;
        let has_next = response
            .has_more
            .unwrap_or_else(|| offset + (response.logs.len() as u64) < response.total);

        Ok(Page::new(response.logs, response.total, has_next, response.stats))
    }
}
