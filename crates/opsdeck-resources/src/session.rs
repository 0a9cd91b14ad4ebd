//! Session and tenant configuration
//!
//! The dashboard is multi-tenant: every request goes to the tenant's own API
//! host and carries the operator's bearer token. Sources read both through
//! [`SessionProvider`] on every request, so a re-login takes effect without
//! rebuilding the sources.

use serde::{Deserialize, Serialize};

/// Per-tenant connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantConfig {
    /// API host, e.g. `https://tenant.example.com`
    pub api_url: String,
    /// CRM subdomain
    pub subdomain: Option<String>,
    /// CRM pipeline id
    pub pipeline_id: Option<String>,
    /// Settings document id
    pub settings_id: Option<String>,
}

impl TenantConfig {
    /// Tenant reachable at `api_url`
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }
}

/// Source of the current tenant and credentials
#[cfg_attr(test, mockall::automock)]
pub trait SessionProvider: Send + Sync {
    /// Current tenant configuration
    fn tenant(&self) -> TenantConfig;

    /// Bearer token of the logged-in operator
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed session (CLI, tests)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSession {
    tenant: TenantConfig,
    token: Option<String>,
}

impl StaticSession {
    /// Session for `tenant` without credentials
    #[must_use]
    pub fn new(tenant: TenantConfig) -> Self {
        Self {
            tenant,
            token: None,
        }
    }

    /// With bearer token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl SessionProvider for StaticSession {
    fn tenant(&self) -> TenantConfig {
        self.tenant.clone()
    }

    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
