//! Query identity
//!
//! A [`QueryKey`] answers "is this the same logical query as before": it covers
//! the committed filters, the sort and the page size, but not the position.
//! A [`PageKey`] adds the paginated offset and identifies one request.

use crate::filter::FilterSet;
use crate::page::PageRequest;
use crate::sort::SortSpec;

/// Comparable identity of what is being asked for, excluding position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    /// Committed filters
    pub filters: FilterSet,
    /// Active sort
    pub sort: SortSpec,
    /// Page size
    pub limit: u32,
}

impl QueryKey {
    /// Build a key
    #[inline]
    #[must_use]
    pub fn new(filters: FilterSet, sort: SortSpec, limit: u32) -> Self {
        Self {
            filters,
            sort,
            limit,
        }
    }

    /// Key for the paginated request of 1-based `page`
    #[must_use]
    pub fn page(&self, page: u32) -> PageKey {
        PageKey {
            query: self.clone(),
            offset: u64::from(page.saturating_sub(1)) * u64::from(self.limit),
        }
    }

    /// Infinite-mode request for 1-based `page`
    #[inline]
    #[must_use]
    pub fn numbered(&self, page: u32) -> PageRequest {
        PageRequest::Number {
            page,
            limit: self.limit,
        }
    }
}

/// One paginated request: query plus offset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    /// Logical query
    pub query: QueryKey,
    /// Zero-based record offset
    pub offset: u64,
}

impl PageKey {
    /// Request to hand to the page source
    #[inline]
    #[must_use]
    pub fn request(&self) -> PageRequest {
        PageRequest::Offset {
            offset: self.offset,
            limit: self.query.limit,
        }
    }

    /// 1-based page number of this offset
    #[inline]
    #[must_use]
    pub fn page_number(&self) -> u32 {
        self.request().page_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterField;

    fn key(search: &str, limit: u32) -> QueryKey {
        QueryKey::new(
            FilterSet::new().with(FilterField::Search, search),
            SortSpec::default(),
            limit,
        )
    }

    #[test]
    fn keys_compare_by_every_component() {
        assert_eq!(key("acme", 10), key("acme", 10));
        assert_ne!(key("acme", 10), key("acme", 20));
        assert_ne!(key("acme", 10), key("acme corp", 10));

        let mut resorted = key("acme", 10);
        resorted.sort = SortSpec::ascending("createdAt");
        assert_ne!(resorted, key("acme", 10));
    }

    #[test]
    fn page_keys_carry_offsets() {
        let query = key("acme", 10);
        assert_eq!(query.page(1).offset, 0);
        assert_eq!(query.page(2).offset, 10);
        assert_eq!(query.page(2).page_number(), 2);
        assert_ne!(query.page(1), query.page(2));
    }
}
