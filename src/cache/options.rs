//! Cache configuration: the strategy hooks and their plain-data settings.
//!
//! [`CacheOptions`] holds the behaviour of a [`ResponseCache`](super::ResponseCache)
//! as a set of replaceable functions, each defaulting to the built-in
//! implementation. [`CacheConfig`] holds the serializable settings that can
//! come from a config file.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use super::entry::CachedEntry;
use super::error::BoxError;
use super::store::DEFAULT_MAX_SIZE_BYTES;
use super::{client_match, freshness, key, normalize, ttl};
use crate::http::{Headers, Request};

/// Future returned by the decision hooks. It may borrow the hook's arguments.
pub type HookFuture<'a, T> = BoxFuture<'a, Result<T, BoxError>>;

/// Decides whether a request takes part in caching at all.
pub type ShouldCacheFn = Arc<dyn for<'a> Fn(&'a Request) -> HookFuture<'a, bool> + Send + Sync>;

/// Derives the store key for a request. Must not resolve to an empty string.
pub type GetKeyFn = Arc<dyn for<'a> Fn(&'a Request) -> HookFuture<'a, String> + Send + Sync>;

/// Computes the lifetime, in milliseconds, of a captured response.
pub type GetTtlFn = Arc<dyn for<'a> Fn(&'a Headers, SystemTime) -> HookFuture<'a, i64> + Send + Sync>;

/// Decides whether a stored entry may answer a request.
pub type CompareCacheFn =
    Arc<dyn for<'a> Fn(&'a Request, &'a CachedEntry) -> HookFuture<'a, bool> + Send + Sync>;

/// Decides whether the client already holds the stored entry.
pub type ClientMatchFn =
    Arc<dyn for<'a> Fn(&'a Request, &'a CachedEntry) -> BoxFuture<'a, bool> + Send + Sync>;

/// Rewrites the headers of a fresh response before it is sent and stored.
/// Receives the estimated update interval in milliseconds and the current time.
pub type TransformHeadersFn = Arc<dyn Fn(&mut Headers, Option<u64>, SystemTime) + Send + Sync>;

/// What happens to a request when a decision hook fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Handle the request as if caching were off.
    #[default]
    FallThrough,
    /// Answer `500 Internal Server Error`.
    Fail,
}

/// Serializable cache settings.
///
/// Every field has a default, so partial documents are accepted.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::{CacheConfig, ErrorPolicy};
///
/// let config = CacheConfig::from_json(r#"{ "max_size_bytes": 50, "error_policy": "fail" }"#).unwrap();
/// assert!(config.enabled);
/// assert_eq!(config.max_size_bytes, 50);
/// assert_eq!(config.error_policy, ErrorPolicy::Fail);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch for the cache layer.
    pub enabled: bool,
    /// Upper bound on stored body bytes for the in-memory store.
    pub max_size_bytes: usize,
    /// How often the content is expected to change, used when a response
    /// has a `date` but no `expires`.
    pub estimated_interval_ms: Option<u64>,
    pub error_policy: ErrorPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            estimated_interval_ms: None,
            error_policy: ErrorPolicy::FallThrough,
        }
    }
}

impl CacheConfig {
    /// Parses settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed JSON or mistyped fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Runtime configuration of a [`ResponseCache`](super::ResponseCache).
///
/// Starts from the built-in behaviour; each setter replaces one piece. The
/// decision hooks return boxed futures, so they can await lookups of their
/// own before answering.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::CacheOptions;
///
/// let options = CacheOptions::new()
///     .should_cache(|req| Box::pin(async move { Ok(req.path() != "/health") }))
///     .get_key(|req| Box::pin(async move { Ok(format!("v1:{}", req.original_url())) }))
///     .estimated_interval_ms(300_000);
/// assert!(options.is_enabled());
/// ```
#[derive(Clone)]
pub struct CacheOptions {
    pub(crate) enabled: bool,
    pub(crate) should_cache: ShouldCacheFn,
    pub(crate) get_key: GetKeyFn,
    pub(crate) get_ttl: GetTtlFn,
    pub(crate) compare_cache: CompareCacheFn,
    pub(crate) cache_client_match: ClientMatchFn,
    pub(crate) transform_headers: TransformHeadersFn,
    pub(crate) estimated_interval_ms: Option<u64>,
    pub(crate) error_policy: ErrorPolicy,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            should_cache: Arc::new(cache_everything),
            get_key: Arc::new(default_key),
            get_ttl: Arc::new(default_ttl),
            compare_cache: Arc::new(default_compare),
            cache_client_match: Arc::new(default_client_match),
            transform_headers: Arc::new(normalize::normalize_headers),
            estimated_interval_ms: None,
            error_policy: ErrorPolicy::FallThrough,
            clock: Arc::new(SystemClock),
        }
    }
}

fn cache_everything(_: &Request) -> HookFuture<'_, bool> {
    Box::pin(async { Ok(true) })
}

fn default_key(request: &Request) -> HookFuture<'_, String> {
    Box::pin(async move { key::derive_key(request) })
}

fn default_ttl(headers: &Headers, now: SystemTime) -> HookFuture<'_, i64> {
    Box::pin(async move { Ok(ttl::extract_ttl(headers, now)?) })
}

fn default_compare<'a>(request: &'a Request, entry: &'a CachedEntry) -> HookFuture<'a, bool> {
    Box::pin(async move { Ok(freshness::is_applicable(request, entry)) })
}

fn default_client_match<'a>(request: &'a Request, entry: &'a CachedEntry) -> BoxFuture<'a, bool> {
    Box::pin(async move { client_match::is_exact_client_match(request, entry) })
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from serializable settings, keeping the default hooks.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            estimated_interval_ms: config.estimated_interval_ms,
            error_policy: config.error_policy,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn should_cache<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a Request) -> HookFuture<'a, bool> + Send + Sync + 'static,
    {
        self.should_cache = Arc::new(f);
        self
    }

    #[must_use]
    pub fn get_key<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a Request) -> HookFuture<'a, String> + Send + Sync + 'static,
    {
        self.get_key = Arc::new(f);
        self
    }

    #[must_use]
    pub fn get_ttl<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a Headers, SystemTime) -> HookFuture<'a, i64> + Send + Sync + 'static,
    {
        self.get_ttl = Arc::new(f);
        self
    }

    #[must_use]
    pub fn compare_cache<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a Request, &'a CachedEntry) -> HookFuture<'a, bool> + Send + Sync + 'static,
    {
        self.compare_cache = Arc::new(f);
        self
    }

    #[must_use]
    pub fn cache_client_match<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a Request, &'a CachedEntry) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        self.cache_client_match = Arc::new(f);
        self
    }

    #[must_use]
    pub fn transform_headers<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Headers, Option<u64>, SystemTime) + Send + Sync + 'static,
    {
        self.transform_headers = Arc::new(f);
        self
    }

    /// Sets the expected update interval used for responses that only carry a `date`.
    #[must_use]
    pub fn estimated_interval_ms(mut self, ms: u64) -> Self {
        self.estimated_interval_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn estimated_interval(self, interval: Duration) -> Self {
        self.estimated_interval_ms(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX))
    }

    #[must_use]
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Sets the time source for TTLs and header normalization.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("enabled", &self.enabled)
            .field("estimated_interval_ms", &self.estimated_interval_ms)
            .field("error_policy", &self.error_policy)
            .finish_non_exhaustive()
    }
}
