//! LRU cache for resolved page lists
//!
//! Chapter page URLs are re-requested on every chapter open in continuous
//! reading; caching the resolver responses keeps boundary transitions from
//! hitting the network for a chapter that was just prefetched.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::request::ResolvedPages;
use crate::reader::ChapterId;

/// Cache key for resolved page lists
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub chapter: ChapterId,
}

impl CacheKey {
    #[must_use]
    pub const fn for_chapter(chapter: ChapterId) -> Self {
        Self { chapter }
    }
}

/// LRU cache of resolver responses
pub struct ResolvedPagesCache {
    cache: LruCache<CacheKey, Arc<ResolvedPages>>,
}

impl ResolvedPagesCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero")),
            ),
        }
    }

    /// Get a cached page list, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<ResolvedPages>> {
        self.cache.get(key).cloned()
    }

    /// Check if a key is in the cache without promoting it
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a page list, returning an Arc to the data
    pub fn insert(&mut self, key: CacheKey, pages: ResolvedPages) -> Arc<ResolvedPages> {
        let arc = Arc::new(pages);
        self.cache.put(key, arc.clone());
        arc
    }

    /// Clear all cached page lists
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    /// Drop the cached page list for one chapter (retry after failure,
    /// or the chapter's data was refreshed server-side)
    pub fn invalidate_chapter(&mut self, chapter: ChapterId) {
        self.cache.pop(&CacheKey::for_chapter(chapter));
    }

    /// Number of cached page lists
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cache capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
