//! Per-request caching decisions.
//!
//! [`ResponseCache::decide`] walks a request through the cache:
//!
//! ```text
//! disabled ─────────────────────────────────────────► Passthrough
//! should_cache = false ─────────────────────────────► Skip
//! get_key → store.get ── miss ──────────────────────► Forward { stale: false }
//!                     └─ hit → compare_cache ── no ─► Forward { stale: true }
//!                                             └ yes ► client match ? NotModified : Serve
//! ```
//!
//! [`ResponseCache::handle`] turns the decision into a response. `Forward`
//! runs the rest of the pipeline and captures a successful response into the
//! store once its body has been fully sent.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::entry::{CacheKey, CachedEntry};
use super::error::{CacheError, Hook};
use super::intercept::{CapturedResponse, CompletionFuture, intercept};
use super::options::{CacheOptions, ErrorPolicy, GetTtlFn};
use super::store::{CacheStore, SetOptions};
use crate::context::Context;
use crate::http::{Request, Response, StatusCode};
use crate::middleware::Next;

/// The outcome of [`ResponseCache::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Caching is disabled.
    Passthrough,
    /// The request opted out of caching.
    Skip,
    /// Replay the stored response.
    Serve(CachedEntry),
    /// The client already has the stored response.
    NotModified(CachedEntry),
    /// Run the handler and capture its response under `key`. `stale` is set
    /// when an entry existed but did not suit the request.
    Forward { key: CacheKey, stale: bool },
}

/// A response cache: the configured hooks plus the store they feed.
pub struct ResponseCache {
    options: CacheOptions,
    store: Arc<dyn CacheStore>,
}

impl ResponseCache {
    pub fn new(options: CacheOptions, store: Arc<dyn CacheStore>) -> Self {
        Self { options, store }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Decides how `request` should be answered.
    ///
    /// # Errors
    ///
    /// [`CacheError::Hook`] when `should_cache`, `get_key` or `compare_cache`
    /// fails, [`CacheError::InvalidKey`] for an empty key, and
    /// [`CacheError::Store`] when the lookup fails.
    pub async fn decide(&self, request: &Request) -> Result<Decision, CacheError> {
        let options = &self.options;
        if !options.enabled {
            return Ok(Decision::Passthrough);
        }

        let should_cache = (options.should_cache)(request)
            .await
            .map_err(|e| CacheError::hook(Hook::ShouldCache, e))?;
        if !should_cache {
            debug!(path = %request.path(), "request skips the cache");
            return Ok(Decision::Skip);
        }

        let key = (options.get_key)(request)
            .await
            .map_err(|e| CacheError::hook(Hook::GetKey, e))?;
        let key = CacheKey::new(key)?;

        let Some(entry) = self.store.get(key.as_str()).await? else {
            debug!(key = %key, "cache miss");
            return Ok(Decision::Forward { key, stale: false });
        };

        let applicable = (options.compare_cache)(request, &entry)
            .await
            .map_err(|e| CacheError::hook(Hook::CompareCache, e))?;
        if !applicable {
            debug!(key = %key, "cached entry does not suit request");
            return Ok(Decision::Forward { key, stale: true });
        }

        if (options.cache_client_match)(request, &entry).await {
            debug!(key = %key, "client copy is current");
            return Ok(Decision::NotModified(entry));
        }

        debug!(key = %key, "cache hit");
        Ok(Decision::Serve(entry))
    }

    /// Answers the request in `ctx`, calling `next` when the cache cannot.
    ///
    /// A failed decision is logged and handled per the configured
    /// [`ErrorPolicy`]. Failures after the handler ran (TTL, store write) only
    /// prevent caching; the client response is unaffected.
    pub async fn handle(&self, ctx: Context, next: Next) -> Response {
        let decision = match self.decide(ctx.request()).await {
            Ok(decision) => decision,
            Err(err) => {
                error!(error = %err, path = %ctx.request().path(), "response cache failed");
                return match self.options.error_policy {
                    ErrorPolicy::FallThrough => next.run(ctx).await,
                    ErrorPolicy::Fail => Response::new(StatusCode::InternalServerError)
                        .body("Internal Server Error"),
                };
            }
        };

        match decision {
            Decision::Passthrough | Decision::Skip => next.run(ctx).await,
            Decision::NotModified(entry) => entry.to_not_modified(),
            Decision::Serve(entry) => entry.to_response(),
            Decision::Forward { key, .. } => {
                let response = next.run(ctx).await;
                self.capture(key, response)
            }
        }
    }

    fn capture(&self, key: CacheKey, response: Response) -> Response {
        let options = &self.options;
        let transform = Arc::clone(&options.transform_headers);
        let interval = options.estimated_interval_ms;
        let now = options.clock.now();

        let writer = Writer {
            key,
            get_ttl: Arc::clone(&options.get_ttl),
            clock: Arc::clone(&options.clock),
            store: Arc::clone(&self.store),
        };

        intercept(
            response,
            move |headers| transform(headers, interval, now),
            Box::new(move |captured| -> CompletionFuture { Box::pin(writer.write(captured)) }),
        )
    }
}

// Everything the completion of one captured response needs.
struct Writer {
    key: CacheKey,
    get_ttl: GetTtlFn,
    clock: Arc<dyn Clock>,
    store: Arc<dyn CacheStore>,
}

impl Writer {
    async fn write(self, captured: CapturedResponse) {
        let ttl = match (self.get_ttl)(&captured.headers, self.clock.now()).await {
            Ok(ttl) => ttl,
            Err(err) => {
                let err = CacheError::hook(Hook::GetTtl, err);
                warn!(key = %self.key, error = %err, "not caching response");
                return;
            }
        };

        let entry = CachedEntry::new(captured.status, &captured.headers, captured.body);
        let options = SetOptions {
            size_hint: entry.size(),
            ttl: Duration::from_millis(ttl.max(0).unsigned_abs()),
        };

        let key = self.key.clone();
        match self.store.set(self.key, entry, options).await {
            Ok(()) => info!(
                key = %key,
                ttl_ms = ttl,
                size = options.size_hint,
                "response cached"
            ),
            Err(err) => warn!(key = %key, error = %err, "cache store write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use tokio::sync::Notify;

    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::error::StoreError;
    use crate::cache::store::{MemoryStore, StoreFuture};
    use crate::http::Headers;

    // Counts calls and forwards to a memory store.
    struct Counting {
        inner: MemoryStore,
        gets: AtomicUsize,
        sets: AtomicUsize,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                inner: MemoryStore::with_clock(1_000, Arc::new(ManualClock::at_millis(0))),
                gets: AtomicUsize::new(0),
                sets: AtomicUsize::new(0),
            }
        }
    }

    impl CacheStore for Counting {
        fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<CachedEntry>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key)
        }

        fn set(&self, key: CacheKey, entry: CachedEntry, options: SetOptions) -> StoreFuture<'_, ()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, entry, options)
        }
    }

    struct Unavailable;

    impl CacheStore for Unavailable {
        fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<CachedEntry>> {
            Box::pin(async { Err(StoreError::Unavailable("connection refused".into())) })
        }

        fn set(&self, _key: CacheKey, _entry: CachedEntry, _options: SetOptions) -> StoreFuture<'_, ()> {
            Box::pin(async { Err(StoreError::Unavailable("connection refused".into())) })
        }
    }

    // Holds every write until released.
    #[derive(Default)]
    struct Gated {
        release: Notify,
        written: Notify,
        sets: AtomicUsize,
    }

    impl CacheStore for Gated {
        fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<CachedEntry>> {
            Box::pin(async { Ok(None) })
        }

        fn set(&self, _key: CacheKey, _entry: CachedEntry, _options: SetOptions) -> StoreFuture<'_, ()> {
            Box::pin(async move {
                self.release.notified().await;
                self.sets.fetch_add(1, Ordering::SeqCst);
                self.written.notify_one();
                Ok(())
            })
        }
    }

    async fn seed(store: &Counting, key: &str, headers: &[(&str, &str)]) {
        let headers: Headers = headers.iter().copied().collect();
        let entry = CachedEntry::new(StatusCode::Ok, &headers, Bytes::from_static(b"cached"));
        let options = SetOptions {
            size_hint: entry.size(),
            ttl: Duration::from_secs(60),
        };
        store
            .set(CacheKey::new(key).unwrap(), entry, options)
            .await
            .unwrap();
    }

    fn setup(options: CacheOptions) -> (Arc<Counting>, ResponseCache) {
        let store = Arc::new(Counting::new());
        let cache = ResponseCache::new(options, store.clone());
        (store, cache)
    }

    #[tokio::test]
    async fn disabled_passes_through() {
        let (store, cache) = setup(CacheOptions::new().enabled(false));
        let decision = cache.decide(&Request::get("/")).await.unwrap();
        assert_eq!(decision, Decision::Passthrough);
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_cache_false_never_touches_the_store() {
        let (store, cache) = setup(CacheOptions::new().should_cache(|_| Box::pin(async { Ok(false) })));
        let decision = cache.decide(&Request::get("/")).await.unwrap();
        assert_eq!(decision, Decision::Skip);
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn miss_forwards() {
        let (_, cache) = setup(CacheOptions::new());
        let decision = cache.decide(&Request::get("/a")).await.unwrap();
        assert_eq!(
            decision,
            Decision::Forward {
                key: CacheKey::new("GET /a").unwrap(),
                stale: false
            }
        );
    }

    #[tokio::test]
    async fn hit_serves_applicable_entry() {
        let (store, cache) = setup(CacheOptions::new());
        seed(&store, "GET /a", &[("content-type", "text/html")]).await;

        let req = Request::get("/a").header("Accept", "text/html");
        assert!(matches!(cache.decide(&req).await.unwrap(), Decision::Serve(_)));

        let req = Request::get("/a").header("Accept", "application/json");
        assert!(matches!(
            cache.decide(&req).await.unwrap(),
            Decision::Forward { stale: true, .. }
        ));
    }

    #[tokio::test]
    async fn matching_etag_is_not_modified() {
        let (store, cache) = setup(CacheOptions::new());
        seed(&store, "GET /a", &[("etag", "\"abc\"")]).await;

        let req = Request::get("/a").header("If-None-Match", "\"abc\"");
        let Decision::NotModified(entry) = cache.decide(&req).await.unwrap() else {
            panic!("expected 304");
        };
        assert_eq!(entry.headers().get("etag"), Some("\"abc\""));
    }

    #[tokio::test]
    async fn hook_errors_are_reported() {
        let (_, cache) = setup(CacheOptions::new().should_cache(|_| Box::pin(async { Err("nope".into()) })));
        let err = cache.decide(&Request::get("/")).await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::Hook {
                hook: Hook::ShouldCache,
                ..
            }
        ));

        let (_, cache) = setup(CacheOptions::new().get_key(|_| Box::pin(async { Ok(String::new()) })));
        let err = cache.decide(&Request::get("/")).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey));
    }

    #[tokio::test]
    async fn hooks_can_await_their_own_lookups() {
        let excluded = Arc::new(tokio::sync::RwLock::new(vec!["/admin".to_owned()]));
        let options = CacheOptions::new()
            .should_cache(move |req| {
                let excluded = Arc::clone(&excluded);
                Box::pin(async move {
                    tokio::task::yield_now().await;
                    Ok(!excluded.read().await.iter().any(|path| path == req.path()))
                })
            })
            .get_key(|req| {
                Box::pin(async move {
                    tokio::task::yield_now().await;
                    Ok(format!("tenant-a:{}", req.path()))
                })
            });
        let (store, cache) = setup(options);

        assert_eq!(cache.decide(&Request::get("/admin")).await.unwrap(), Decision::Skip);
        assert_eq!(
            cache.decide(&Request::get("/a")).await.unwrap(),
            Decision::Forward {
                key: CacheKey::new("tenant-a:/a").unwrap(),
                stale: false
            }
        );
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn compare_hook_errors_propagate() {
        let (store, cache) =
            setup(CacheOptions::new().compare_cache(|_, _| Box::pin(async { Err("bad".into()) })));
        seed(&store, "GET /a", &[]).await;
        let err = cache.decide(&Request::get("/a")).await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::Hook {
                hook: Hook::CompareCache,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn store_errors_are_reported() {
        let cache = ResponseCache::new(CacheOptions::new(), Arc::new(Unavailable));
        let err = cache.decide(&Request::get("/")).await.unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn ttl_failure_skips_the_write() {
        let (store, cache) = setup(CacheOptions::new());
        let response = cache.capture(
            CacheKey::new("GET /a").unwrap(),
            Response::new(StatusCode::Ok)
                .header("Cache-Control", "max-age=soon")
                .body("x"),
        );
        let (_, body) = response.into_parts();
        body.collect().await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_store_write_does_not_hold_the_body() {
        let store = Arc::new(Gated::default());
        let cache = ResponseCache::new(CacheOptions::new(), store.clone());
        let response = cache.capture(
            CacheKey::new("GET /a").unwrap(),
            Response::new(StatusCode::Ok).header("Expires", "60000").body("x"),
        );

        let (_, body) = response.into_parts();
        assert_eq!(body.collect().await.unwrap(), Bytes::from("x"));
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);

        store.release.notify_one();
        store.written.notified().await;
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
    }
}
