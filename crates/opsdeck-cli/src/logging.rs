//! Tracing subscriber setup
//!
//! Events go to stderr so list output on stdout stays machine-readable.
//! `RUST_LOG` wins over the configured level.

use crate::config::LogFormat;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors from logging initialisation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoggingError {
    /// Level directive could not be parsed
    #[error("invalid log level {level:?}: {reason}")]
    InvalidLevel {
        /// Directive as configured
        level: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("tracing subscriber already initialized")]
    SubscriberAlreadySet,
}

/// Build the filter: `RUST_LOG` if set and valid, else `level`
pub fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidLevel {
        level: level.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber
pub fn init(level: &str, format: LogFormat) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level)?)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|_| LoggingError::SubscriberAlreadySet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_applies_without_rust_log() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(env_filter("warn,opsdeck_query=debug").is_ok());
        assert!(matches!(
            env_filter("opsdeck_query=loud"),
            Err(LoggingError::InvalidLevel { .. })
        ));
    }
}
