//! Registered user resource (`GET /request_register/`)

use crate::client::{ApiClient, QueryPairs};
use crate::params::{filter_pairs, PaginationInfo};
use async_trait::async_trait;
use opsdeck_query::{
    FetchError, FilterField, FilterSet, Page, PageRequest, PageSource, Record, RecordId, SortSpec,
};
use serde::{Deserialize, Serialize};

/// A user registered through one of the bot channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    /// Database id
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Login name
    #[serde(default)]
    pub username: String,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Registration channel
    #[serde(default)]
    pub channel: String,
    /// Registration status
    #[serde(default)]
    pub status: String,
    /// Bot instance that registered the user
    #[serde(default)]
    pub bot_num: Option<u32>,
    /// Failure detail for failed registrations
    #[serde(default)]
    pub error_message: Option<String>,
    /// Registration time, as sent by the server
    #[serde(default, rename = "createAt")]
    pub created_at: Option<String>,
}

impl Record for RegisteredUser {
    fn record_id(&self) -> RecordId {
        RecordId::new(self.id.clone())
    }
}

/// Users carry no summary block beyond the matching count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    /// Matching users
    pub total: u64,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<RegisteredUser>,
    #[serde(default)]
    pagination: PaginationInfo,
}

fn param_name(field: FilterField) -> Option<&'static str> {
    match field {
        FilterField::Status
        | FilterField::Channel
        | FilterField::StartDate
        | FilterField::EndDate => Some(field.as_str()),
        _ => None,
    }
}

/// Registered users
#[derive(Debug, Clone)]
pub struct UsersSource {
    client: ApiClient,
}

impl UsersSource {
    /// Source over `client`
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for UsersSource {
    type Record = RegisteredUser;
    type Stats = UserStats;

    fn name(&self) -> &str {
        "users"
    }

    fn supports(&self, field: FilterField) -> bool {
        param_name(field).is_some()
    }

    async fn fetch_page(
        &self,
        filters: &FilterSet,
        _sort: &SortSpec,
        request: PageRequest,
    ) -> Result<Page<RegisteredUser, UserStats>, FetchError> {
        let mut query: QueryPairs = vec![
            ("page", request.page_number().to_string()),
            ("limit", request.limit().to_string()),
        ];
        query.extend(filter_pairs(filters, param_name));

        let response: UsersResponse = self.client.get_json("/request_register/", &query).await?;
        let total = response.pagination.total;
        Ok(Page::new(
            response.users,
            total,
            response.pagination.has_next,
            UserStats { total },
        ))
    }
}
