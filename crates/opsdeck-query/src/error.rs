//! Error types for the list-query engine
//!
//! Two families:
//! - [`FetchError`]: transient failures returned by a [`PageSource`](crate::source::PageSource).
//!   They are stored in the view's error slot and only cleared by a manual retry
//!   or a new query.
//! - [`QueryError`]: caller misuse of a list view (page 0, page size 0), reported
//!   synchronously and never stored.

/// Failure of a single page fetch
///
/// Returned as a value by page sources; the engine never retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (connection refused, reset, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body, or the status line
        message: String,
    },

    /// Response body could not be decoded into a page
    #[error("malformed response: {0}")]
    Decode(String),

    /// Source is not able to serve requests (missing tenant configuration, shut down)
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Create a status error
    #[inline]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

/// Invalid command issued to a list view
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Page numbers start at 1
    #[error("page numbers start at 1, got {0}")]
    InvalidPage(u32),

    /// Page size must be positive
    #[error("page size must be greater than zero")]
    InvalidPageSize,

    /// Operation only exists in the other fetch mode
    #[error("operation requires {required} mode")]
    WrongMode {
        /// Mode the operation needs
        required: &'static str,
    },
}
