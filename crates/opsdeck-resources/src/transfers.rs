//! Transfer request resource (`GET /request_image`) and its actions
//!
//! Page-numbered: requests carry `page`/`limit` and the response's
//! `pagination` block supplies the total and `hasNext`.

use crate::client::{ApiClient, QueryPairs};
use crate::params::{filter_pairs, PaginationInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsdeck_query::{
    FetchError, FilterField, FilterSet, Page, PageRequest, PageSource, Record, RecordId, SortSpec,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Review status of a transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Waiting for review
    Pending,
    /// Approved by an operator
    Approved,
    /// Rejected by an operator
    Rejected,
    /// Credited automatically
    Processed,
    /// Processing failed
    Error,
    /// Status this client does not know
    #[serde(other)]
    Unknown,
}

impl TransferStatus {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Processed => "processed",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data read off the uploaded receipt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedData {
    /// Transferred amount
    pub amount: f64,
    /// Currency code
    pub currency: Option<String>,
    /// Bank operation number
    pub operation_number: Option<String>,
    /// Extraction confidence
    pub confidence: Option<f64>,
}

/// One receipt submitted for review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Database id
    #[serde(rename = "_id")]
    pub id: String,
    /// Submitting username
    #[serde(default)]
    pub username: String,
    /// Messaging platform
    #[serde(default)]
    pub platform: String,
    /// CRM lead id
    #[serde(default)]
    pub lead_id: Option<String>,
    /// Review status
    pub status: TransferStatus,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Receipt extraction, when it succeeded
    #[serde(default)]
    pub extracted_data: Option<ExtractedData>,
}

impl TransferRequest {
    /// Amount read off the receipt, if any
    #[must_use]
    pub fn amount(&self) -> Option<f64> {
        self.extracted_data.as_ref().map(|data| data.amount)
    }
}

impl Record for TransferRequest {
    fn record_id(&self) -> RecordId {
        RecordId::new(self.id.clone())
    }
}

/// Transfer summary block over the whole matching set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferStats {
    /// Matching transfers
    pub total_transfers: u64,
    /// Sum of their amounts
    pub total_amount: f64,
    /// Pending count
    pub pending: u64,
    /// Pending amount
    pub pending_amount: f64,
    /// Processed count
    pub processed: u64,
    /// Processed amount
    pub processed_amount: f64,
    /// Failed count
    pub error: u64,
    /// Failed amount
    pub error_amount: f64,
    /// Mean amount
    pub average_amount: f64,
    /// Approved share, percent
    pub approval_rate: f64,
}

#[derive(Debug, Deserialize)]
struct TransfersResponse {
    #[serde(default)]
    requests: Vec<TransferRequest>,
    #[serde(default)]
    pagination: PaginationInfo,
    #[serde(default)]
    stats: TransferStats,
}

fn param_name(field: FilterField) -> Option<&'static str> {
    match field {
        FilterField::Search
        | FilterField::Status
        | FilterField::StartDate
        | FilterField::EndDate => Some(field.as_str()),
        _ => None,
    }
}

/// Transfer requests
#[derive(Debug, Clone)]
pub struct TransfersSource {
    client: ApiClient,
}

impl TransfersSource {
    /// Source over `client`
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Mark a request approved
    pub async fn approve(&self, id: &RecordId) -> Result<(), FetchError> {
        self.set_status(id, TransferStatus::Approved).await
    }

    /// Mark a request rejected
    pub async fn reject(&self, id: &RecordId) -> Result<(), FetchError> {
        self.set_status(id, TransferStatus::Rejected).await
    }

    /// Turn automatic processing on or off
    pub async fn set_automation(&self, enabled: bool) -> Result<(), FetchError> {
        tracing::info!(enabled, "setting transfer automation");
        self.client
            .put_json("/request_register/automatization", &json!({ "status": enabled }))
            .await
    }

    async fn set_status(&self, id: &RecordId, status: TransferStatus) -> Result<(), FetchError> {
        tracing::info!(%id, %status, "updating transfer request");
        self.client
            .put_json(&format!("/request_image/{id}"), &json!({ "status": status }))
            .await
    }
}

#[async_trait]
impl PageSource for TransfersSource {
    type Record = TransferRequest;
    type Stats = TransferStats;

    fn name(&self) -> &str {
        "transfers"
    }

    fn supports(&self, field: FilterField) -> bool {
        param_name(field).is_some()
    }

    async fn fetch_page(
        &self,
        filters: &FilterSet,
        _sort: &SortSpec,
        request: PageRequest,
    ) -> Result<Page<TransferRequest, TransferStats>, FetchError> {
        let mut query: QueryPairs = vec![
            ("page", request.page_number().to_string()),
            ("limit", request.limit().to_string()),
        ];
        query.extend(filter_pairs(filters, param_name));

        let response: TransfersResponse = self.client.get_json("/request_image", &query).await?;
        Ok(Page::new(
            response.requests,
            response.pagination.total,
            response.pagination.has_next,
            response.stats,
        ))
    }
}
