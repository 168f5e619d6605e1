//! HTTP response caching.
//!
//! [`CacheMiddleware`] plugs a [`ResponseCache`] into the middleware pipeline.
//! For each request the cache either replays a stored response, answers
//! `304 Not Modified`, or lets the request through and records the
//! handler's `2xx` response as it streams to the client.
//!
//! The pieces are usable on their own:
//!
//! - [`derive_key`]: default cache key (`GET /path?query`).
//! - [`extract_ttl`]: lifetime from `cache-control` / `expires`.
//! - [`normalize_headers`]: fills in `cache-control`, `expires` and `date`.
//! - [`is_applicable`]: content negotiation against a stored entry.
//! - [`is_exact_client_match`]: `if-modified-since` / `if-none-match`.
//! - [`intercept::intercept`]: capture of a streamed response.
//!
//! Every step can be replaced through [`CacheOptions`]; the decision hooks
//! are async. Storage is behind
//! [`CacheStore`]; [`MemoryStore`] keeps entries in process.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rttp_cache::cache::{CacheConfig, CacheMiddleware, CacheOptions, MemoryStore, SystemClock};
//! use rttp_cache::middleware::from_middleware;
//!
//! let config = CacheConfig::from_json(r#"{ "max_size_bytes": 1048576 }"#).unwrap();
//! let store = MemoryStore::from_config(&config, Arc::new(SystemClock));
//! let cache = CacheMiddleware::new(CacheOptions::from_config(&config), Arc::new(store));
//! let layer = from_middleware(Arc::new(cache));
//! ```

mod client_match;
mod clock;
pub mod control;
mod entry;
mod error;
mod freshness;
pub mod intercept;
mod key;
mod middleware;
pub mod negotiate;
mod normalize;
mod options;
mod policy;
mod store;
mod ttl;

pub use client_match::is_exact_client_match;
pub use clock::{Clock, ManualClock, SystemClock, epoch_millis, from_epoch_millis};
pub use control::CacheControl;
pub use entry::{CacheKey, CachedEntry};
pub use error::{BoxError, CacheError, Hook, StoreError, TtlError};
pub use freshness::is_applicable;
pub use key::derive_key;
pub use middleware::CacheMiddleware;
pub use normalize::{INFINITE_EXPIRY_MS, normalize_headers};
pub use options::{
    CacheConfig, CacheOptions, ClientMatchFn, CompareCacheFn, ErrorPolicy, GetKeyFn, GetTtlFn,
    HookFuture, ShouldCacheFn, TransformHeadersFn,
};
pub use policy::{Decision, ResponseCache};
pub use store::{CacheStore, DEFAULT_MAX_SIZE_BYTES, MemoryStore, SetOptions, StoreFuture};
pub use ttl::extract_ttl;
