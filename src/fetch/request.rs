//! Fetch request and response types

use crate::reader::ChapterId;

/// Unique identifier for fetch requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Upstream content source a fetch is directed at
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// The built-in local source; no network constraint behind it
    Local,
    /// A remote source, keyed by its server-side id
    Remote(String),
}

impl SourceId {
    #[must_use]
    pub fn remote(id: impl Into<String>) -> Self {
        Self::Remote(id.into())
    }

    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

/// Scheduling priority within a source queue.
///
/// Foreground work (the chapter being opened) runs before prefetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FetchPriority {
    Prefetch,
    Foreground,
}

/// Errors from fetch jobs
#[derive(Debug, thiserror::Error)]
pub enum FetchFault {
    #[error("page list resolver: {detail}")]
    Resolver { detail: String },

    #[error("{detail}")]
    Generic { detail: String },
}

impl FetchFault {
    pub fn resolver(err: impl std::fmt::Display) -> Self {
        Self::Resolver {
            detail: err.to_string(),
        }
    }

    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Ordered page URLs for one chapter, as returned by the resolver
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPages {
    pub urls: Vec<String>,
}

impl ResolvedPages {
    #[must_use]
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.urls.len()
    }
}

/// Response from fetch jobs
#[derive(Debug)]
pub enum FetchResponse {
    /// Resolved page list for a chapter
    Pages {
        id: RequestId,
        chapter: ChapterId,
        pages: ResolvedPages,
    },

    /// Error while resolving
    Error {
        id: RequestId,
        chapter: ChapterId,
        error: FetchFault,
    },
}

/// Request identity for duplicate suppression in the source queue
#[must_use]
pub fn pages_request_key(chapter: ChapterId) -> String {
    format!("pages:{chapter}")
}
