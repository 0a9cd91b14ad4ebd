//! Freshness-window page cache using moka
//!
//! Paginated pages are cached by [`PageKey`] so identical requests made within
//! the freshness window (rapid back/forward navigation, page-size flips) are
//! served without a network call. Entries expire on a time-to-live basis.
//!
//! [`PageCache::invalidate_all`] starts a new epoch. A fetch that began in an
//! earlier epoch still returns its page to the caller but never writes it
//! back, so a refresh cannot be undone by a response that was already in
//! flight.

use crate::page::Page;
use crate::query_key::PageKey;
use moka::future::Cache;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Where a page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Served from the freshness cache
    Cache,
    /// Fetched from the page source
    Network,
}

/// Page cache keyed by query and offset
///
/// Cheap to clone; clones share the same storage and epoch.
pub struct PageCache<T, S> {
    inner: Cache<PageKey, Arc<Page<T, S>>>,
    epoch: Arc<AtomicU64>,
}

impl<T, S> PageCache<T, S>
where
    T: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    /// Create cache whose entries stay fresh for `freshness`
    #[inline]
    #[must_use]
    pub fn with_freshness(max_capacity: u64, freshness: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(freshness)
                .build(),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current invalidation epoch
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Serve from cache or run `fetch`, caching only successful pages
    ///
    /// The page is written back only if no [`invalidate_all`](Self::invalidate_all)
    /// happened while `fetch` was running.
    pub async fn try_get_or_fetch<E, F, Fut>(
        &self,
        key: &PageKey,
        fetch: F,
    ) -> Result<(Arc<Page<T, S>>, Provenance), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Page<T, S>, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok((cached, Provenance::Cache));
        }

        let started = self.epoch();
        let page = Arc::new(fetch().await?);
        if self.epoch() == started {
            self.insert(key.clone(), Arc::clone(&page)).await;
        } else {
            tracing::debug!(offset = key.offset, "cache invalidated during fetch; not storing page");
        }

        Ok((page, Provenance::Network))
    }

    /// Drop every page and start a new epoch
    pub fn invalidate_all(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.inner.invalidate_all();
    }

    async fn insert(&self, key: PageKey, page: Arc<Page<T, S>>) {
        self.inner.insert(key, page).await;
    }

    async fn get(&self, key: &PageKey) -> Option<Arc<Page<T, S>>> {
        self.inner.get(key).await
    }
}

impl<T, S> Clone for PageCache<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            epoch: Arc::clone(&self.epoch),
        }
    }
}

impl<T, S> fmt::Debug for PageCache<T, S>
where
    T: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCache")
            .field("entry_count", &self.inner.entry_count())
            .field("epoch", &self.epoch())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::filter::{FilterField, FilterSet};
    use crate::query_key::QueryKey;
    use crate::sort::SortSpec;
    use std::sync::atomic::AtomicUsize;

    fn key(page: u32) -> PageKey {
        QueryKey::new(
            FilterSet::new().with(FilterField::Search, "acme"),
            SortSpec::default(),
            10,
        )
        .page(page)
    }

    fn page(marker: u32) -> Page<u32, ()> {
        Page::new(vec![marker], 1, false, ())
    }

    fn cache() -> PageCache<u32, ()> {
        PageCache::with_freshness(100, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn cache_insert_and_get() {
        let cache = cache();
        cache.insert(key(1), Arc::new(page(7))).await;

        let retrieved = cache.get(&key(1)).await;
        assert_eq!(retrieved.map(|p| p.records.clone()), Some(vec![7]));
        assert!(cache.get(&key(2)).await.is_none());
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        let (first, provenance) = cache
            .try_get_or_fetch(&key(1), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FetchError>(page(1))
            })
            .await
            .unwrap();
        assert_eq!(provenance, Provenance::Network);

        let (second, provenance) = cache
            .try_get_or_fetch(&key(1), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Unavailable("should use cached page".into()))
            })
            .await
            .unwrap();

        assert_eq!(provenance, Provenance::Cache);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = cache();

        let result = cache
            .try_get_or_fetch(&key(1), || async { Err(FetchError::Network("reset".into())) })
            .await;
        assert!(result.is_err());
        assert!(cache.get(&key(1)).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_all_drops_pages() {
        let cache = cache();
        cache.insert(key(1), Arc::new(page(1))).await;
        assert_eq!(cache.epoch(), 0);

        cache.invalidate_all();
        assert_eq!(cache.epoch(), 1);
        assert!(cache.get(&key(1)).await.is_none());
    }

    #[tokio::test]
    async fn fetch_spanning_invalidation_is_not_stored() {
        let cache = cache();
        let handle = cache.clone();

        let (fetched, provenance) = cache
            .try_get_or_fetch(&key(1), || async move {
                handle.invalidate_all();
                Ok::<_, FetchError>(page(1))
            })
            .await
            .unwrap();

        assert_eq!(provenance, Provenance::Network);
        assert_eq!(fetched.records, vec![1]);
        assert!(cache.get(&key(1)).await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_freshness_window() {
        let cache: PageCache<u32, ()> = PageCache::with_freshness(100, Duration::from_millis(20));
        cache.insert(key(1), Arc::new(page(1))).await;
        assert!(cache.get(&key(1)).await.is_some());

        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get(&key(1)).await.is_none());
    }
}
