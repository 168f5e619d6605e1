//! The cache as a pipeline layer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::options::CacheOptions;
use super::policy::ResponseCache;
use super::store::CacheStore;
use crate::context::Context;
use crate::http::Response;
use crate::middleware::{Middleware, Next};

/// Middleware that answers requests from a [`ResponseCache`] when it can and
/// records fresh responses when it cannot.
///
/// Place it before the layers whose output should be cached.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use rttp_cache::cache::{CacheMiddleware, CacheOptions, MemoryStore};
/// use rttp_cache::middleware::from_middleware;
///
/// let cache = CacheMiddleware::new(CacheOptions::new(), Arc::new(MemoryStore::new(1 << 20)));
/// let layer = from_middleware(Arc::new(cache));
/// ```
#[derive(Clone)]
pub struct CacheMiddleware {
    cache: Arc<ResponseCache>,
}

impl CacheMiddleware {
    pub fn new(options: CacheOptions, store: Arc<dyn CacheStore>) -> Self {
        Self::from_cache(Arc::new(ResponseCache::new(options, store)))
    }

    /// Shares an existing cache, e.g. between several pipelines.
    pub fn from_cache(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }
}

impl Middleware for CacheMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let cache = Arc::clone(&self.cache);
        Box::pin(async move { cache.handle(ctx, next).await })
    }
}
