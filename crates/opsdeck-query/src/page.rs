//! Records, record identities, page requests and fetched pages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a logical record (e.g. a database id)
///
/// Distinct from a record's position in the rendered list, which changes
/// under sorting, filtering and stream growth.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create from anything string-like
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A row that can be listed by the engine
pub trait Record: Clone + Send + Sync + 'static {
    /// Stable identity of this record
    fn record_id(&self) -> RecordId;
}

/// Position requested from a page source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRequest {
    /// Paginated mode: `limit` records starting at `offset`
    Offset {
        /// Zero-based record offset
        offset: u64,
        /// Page size, always > 0
        limit: u32,
    },
    /// Infinite mode: 1-based page number
    Number {
        /// Page number, starting at 1
        page: u32,
        /// Page size, always > 0
        limit: u32,
    },
}

impl PageRequest {
    /// Page size
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> u32 {
        match *self {
            Self::Offset { limit, .. } | Self::Number { limit, .. } => limit,
        }
    }

    /// Zero-based offset of the first requested record
    #[must_use]
    pub fn offset(&self) -> u64 {
        match *self {
            Self::Offset { offset, .. } => offset,
            Self::Number { page, limit } => u64::from(page.saturating_sub(1)) * u64::from(limit),
        }
    }

    /// 1-based page number (offsets that are not page-aligned round down)
    #[must_use]
    pub fn page_number(&self) -> u32 {
        match *self {
            Self::Number { page, .. } => page,
            Self::Offset { offset, limit } => {
                let index = offset / u64::from(limit.max(1));
                u32::try_from(index).unwrap_or(u32::MAX - 1) + 1
            }
        }
    }
}

/// One fetch result
///
/// `total_matching` and `stats` describe the entire filtered set at fetch time,
/// not just `records`.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, S> {
    /// Records in server order
    pub records: Vec<T>,
    /// Count over the whole filtered set
    pub total_matching: u64,
    /// Whether a further page exists
    pub has_next: bool,
    /// Server-computed summary block
    pub stats: S,
}

impl<T, S> Page<T, S> {
    /// Create a page
    #[inline]
    pub fn new(records: Vec<T>, total_matching: u64, has_next: bool, stats: S) -> Self {
        Self {
            records,
            total_matching,
            has_next,
            stats,
        }
    }

    /// Number of records on this page
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Page carries no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
