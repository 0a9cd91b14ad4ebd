//! Configuration file loading with environment overrides
//!
//! Precedence, highest first: `OPSDECK_API_URL` / `OPSDECK_API_TOKEN`, the
//! file given with `--config`, `./opsdeck.toml` when present, built-in
//! defaults.

use opsdeck_query::ListViewConfig;
use opsdeck_resources::{LogsSource, TenantConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "opsdeck.toml";
/// Overrides `[api] url`
pub const ENV_API_URL: &str = "OPSDECK_API_URL";
/// Overrides `[api] token`
pub const ENV_API_TOKEN: &str = "OPSDECK_API_TOKEN";

/// Errors that can occur during config loading
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file at {path}: {reason}")]
    Read {
        /// Path that failed to read
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid TOML in {path}: {reason}")]
    Parse {
        /// Path with invalid TOML
        path: PathBuf,
        /// Parse error details
        reason: String,
    },

    /// A view section has unusable values
    #[error("invalid [views.{view}] section: {reason}")]
    InvalidView {
        /// View name
        view: &'static str,
        /// What is wrong
        reason: String,
    },

    /// No API url in file or environment
    #[error("no API url configured; set [api] url or OPSDECK_API_URL")]
    MissingApiUrl,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// `[api]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSection {
    /// Tenant API host
    pub url: Option<String>,
    /// Bearer token
    pub token: Option<String>,
    /// CRM subdomain
    pub subdomain: Option<String>,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// `[views.*]` sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewsSection {
    /// Activity logs
    pub logs: ListViewConfig,
    /// Transfer requests
    pub transfers: ListViewConfig,
    /// Registered users
    pub users: ListViewConfig,
}

impl Default for ViewsSection {
    fn default() -> Self {
        Self {
            logs: ListViewConfig::default().with_sort(LogsSource::default_sort()),
            transfers: ListViewConfig::default(),
            users: ListViewConfig::default(),
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpsdeckConfig {
    /// API connection
    pub api: ApiSection,
    /// Logging
    pub logging: LoggingSection,
    /// Per-view settings
    pub views: ViewsSection,
}

impl OpsdeckConfig {
    /// Load from `path`, or `./opsdeck.toml` if present, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse one TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|url| !url.trim().is_empty()) {
            self.api.url = Some(url);
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|token| !token.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }

    /// Check every view section
    pub fn validate(&self) -> Result<(), ConfigError> {
        let views = [
            ("logs", &self.views.logs),
            ("transfers", &self.views.transfers),
            ("users", &self.views.users),
        ];
        for (view, config) in views {
            config.validate().map_err(|e| ConfigError::InvalidView {
                view,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Tenant settings for the API client
    pub fn tenant(&self) -> Result<TenantConfig, ConfigError> {
        let url = self
            .api
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingApiUrl)?;
        Ok(TenantConfig {
            subdomain: self.api.subdomain.clone(),
            ..TenantConfig::new(url)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_query::SortSpec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn full_file_is_parsed() {
        let file = write_config(
            r#"
[api]
url = "https://tenant.example.com"
token = "abc"

[logging]
level = "opsdeck_query=debug"
format = "json"

[views.transfers]
page_size = 50
debounce_ms = 250

[views.logs.default_sort]
field = "timestamp"
direction = "asc"
"#,
        );

        let config = OpsdeckConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api.url.as_deref(), Some("https://tenant.example.com"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.views.transfers.page_size, 50);
        assert_eq!(config.views.transfers.debounce_ms, 250);
        assert_eq!(config.views.transfers.freshness_secs, 300);
        assert_eq!(config.views.logs.default_sort, SortSpec::ascending("timestamp"));
        assert_eq!(config.views.users, ListViewConfig::default());
    }

    #[test]
    fn logs_sort_newest_first_by_default() {
        let config = OpsdeckConfig::default();
        assert_eq!(config.views.logs.default_sort, SortSpec::descending("timestamp"));
        assert_eq!(config.views.transfers.default_sort, SortSpec::descending("createdAt"));

        let file = write_config("[api]\nurl = \"https://tenant.example.com\"\n");
        let config = OpsdeckConfig::from_file(file.path()).unwrap();
        assert_eq!(config.views.logs.default_sort, SortSpec::descending("timestamp"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config("[api]\nurl = \"x\"\nretries = 3\n");
        let err = OpsdeckConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OpsdeckConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = OpsdeckConfig::default();
        config.api.url = Some("https://file.example.com".into());

        config.apply_overrides(|key| match key {
            ENV_API_URL => Some("https://env.example.com".into()),
            ENV_API_TOKEN => Some("   ".into()),
            _ => None,
        });

        assert_eq!(config.api.url.as_deref(), Some("https://env.example.com"));
        assert_eq!(config.api.token, None);
    }

    #[test]
    fn zero_page_size_fails_validation() {
        let file = write_config("[views.users]\npage_size = 0\n");
        let config = OpsdeckConfig::from_file(file.path()).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidView { view: "users", .. })
        ));
    }

    #[test]
    fn tenant_requires_url() {
        assert_eq!(OpsdeckConfig::default().tenant(), Err(ConfigError::MissingApiUrl));

        let mut config = OpsdeckConfig::default();
        config.api.url = Some("https://tenant.example.com".into());
        config.api.subdomain = Some("acme".into());
        let tenant = config.tenant().unwrap();
        assert_eq!(tenant.api_url, "https://tenant.example.com");
        assert_eq!(tenant.subdomain.as_deref(), Some("acme"));
    }
}
