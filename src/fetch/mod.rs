//! Fetch infrastructure: per-source queueing and response caching

mod cache;
mod queue;
mod request;

pub use cache::{CacheKey, ResolvedPagesCache};
pub use queue::SourceAwareQueue;
pub use request::{
    pages_request_key, FetchFault, FetchPriority, FetchResponse, RequestId, ResolvedPages, SourceId,
};

/// Concurrent fetches allowed per remote source
pub const DEFAULT_SOURCE_CONCURRENCY: usize = 5;

/// Resolved page lists kept in the LRU cache
pub const DEFAULT_CACHE_SIZE: usize = 20;
