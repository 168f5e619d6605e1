//! Error types for the response cache.

use std::fmt;

use thiserror::Error;

use super::control::ParseError;

/// Boxed error returned by user-supplied hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The pluggable hooks of [`CacheOptions`](super::CacheOptions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    ShouldCache,
    GetKey,
    GetTtl,
    CompareCache,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ShouldCache => "should_cache",
            Self::GetKey => "get_key",
            Self::GetTtl => "get_ttl",
            Self::CompareCache => "compare_cache",
        })
    }
}

/// Errors raised while deciding how to serve a request from the cache.
///
/// None of these fail the request by themselves: the middleware reports them
/// and then applies its [`ErrorPolicy`](super::ErrorPolicy).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{hook} hook returned an error: {source}")]
    Hook {
        hook: Hook,
        #[source]
        source: BoxError,
    },

    #[error("get_key hook returned an empty key")]
    InvalidKey,

    #[error("cache store failed: {0}")]
    Store(#[from] StoreError),
}

impl CacheError {
    pub(crate) fn hook(hook: Hook, source: BoxError) -> Self {
        Self::Hook { hook, source }
    }
}

/// Errors from the default TTL extractor.
#[derive(Debug, Error)]
pub enum TtlError {
    #[error("failed to parse cache control headers: {0}")]
    CacheControl(#[from] ParseError),

    #[error("could not determine TTL: neither cache-control nor expires is set")]
    Undetermined,
}

/// Errors reported by a [`CacheStore`](super::CacheStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(#[source] BoxError),
}
