//! Cache storage.
//!
//! [`CacheStore`] is the seam between the caching policy and wherever entries
//! actually live. [`MemoryStore`] is the in-process implementation: an LRU
//! bounded by the total size of stored bodies, with per-entry expiry.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use lru::LruCache;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::entry::{CacheKey, CachedEntry};
use super::error::StoreError;
use super::options::CacheConfig;

/// Boxed future returned by [`CacheStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Write hints passed along with every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOptions {
    /// Size of the entry's body in bytes.
    pub size_hint: usize,
    /// How long the entry may be served. Zero means the entry is stale as
    /// soon as it is written.
    pub ttl: Duration,
}

/// Backing storage for cached responses.
///
/// Implementations decide eviction and may be remote. The policy calls
/// `get` once per cacheable request and `set` once per captured response;
/// it never deletes. Concurrent `set` calls for one key are allowed and the
/// last one wins.
pub trait CacheStore: Send + Sync {
    /// Looks up a live entry.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<CachedEntry>>;

    /// Stores `entry` under `key`, replacing any previous entry.
    fn set(&self, key: CacheKey, entry: CachedEntry, options: SetOptions) -> StoreFuture<'_, ()>;
}

/// Default bound on the total body bytes held by a [`MemoryStore`].
pub const DEFAULT_MAX_SIZE_BYTES: usize = 64 * 1024 * 1024;

/// An in-memory [`CacheStore`].
///
/// Entries expire against the store's [`Clock`]; expired entries are
/// dropped on lookup. When a write would exceed `max_size` bytes, least
/// recently used entries are evicted until it fits. An entry larger than
/// the whole store is not kept.
///
/// There is no coordination between concurrent misses for the same key:
/// each one runs the handler and the last write wins.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use std::time::Duration;
/// use bytes::Bytes;
/// use rttp_cache::cache::{CacheKey, CacheStore, CachedEntry, MemoryStore, SetOptions};
/// use rttp_cache::http::{Headers, StatusCode};
///
/// let store = MemoryStore::new(1024);
/// let entry = CachedEntry::new(StatusCode::Ok, &Headers::new(), Bytes::from_static(b"hi"));
/// let options = SetOptions { size_hint: 2, ttl: Duration::from_secs(60) };
///
/// store.set(CacheKey::new("GET /").unwrap(), entry, options).await.unwrap();
/// assert!(store.get("GET /").await.unwrap().is_some());
/// # }
/// ```
pub struct MemoryStore {
    max_size: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: LruCache<String, Slot>,
    size: usize,
}

struct Slot {
    entry: CachedEntry,
    size: usize,
    // `None` when the TTL reaches past what `SystemTime` can represent.
    expires_at: Option<SystemTime>,
}

impl Slot {
    fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

impl MemoryStore {
    /// Creates a store holding at most `max_size` body bytes, timed by the system clock.
    pub fn new(max_size: usize) -> Self {
        Self::with_clock(max_size, Arc::new(SystemClock))
    }

    /// Creates a store timed by `clock`.
    pub fn with_clock(max_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_size,
            clock,
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                size: 0,
            }),
        }
    }

    /// Creates a store sized by `config.max_size_bytes`.
    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(config.max_size_bytes, clock)
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        lock(&self.inner, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total body bytes currently held.
    pub fn size(&self) -> usize {
        lock(&self.inner, "size").size
    }

    fn lookup(&self, key: &str) -> Option<CachedEntry> {
        let now = self.clock.now();
        let mut guard = lock(&self.inner, "get");
        let inner = &mut *guard;

        match inner.entries.get(key) {
            None => return None,
            Some(slot) if slot.is_live(now) => return Some(slot.entry.clone()),
            Some(_) => {}
        }

        if let Some(slot) = inner.entries.pop(key) {
            inner.size -= slot.size;
        }
        debug!(key, "memory store entry expired");
        None
    }

    fn insert(&self, key: CacheKey, entry: CachedEntry, options: SetOptions) {
        let size = options.size_hint;
        let mut guard = lock(&self.inner, "set");
        let inner = &mut *guard;

        if let Some(previous) = inner.entries.pop(key.as_str()) {
            inner.size -= previous.size;
        }

        if size > self.max_size {
            warn!(
                key = %key,
                size,
                max_size = self.max_size,
                "entry larger than memory store, not stored"
            );
            return;
        }

        while inner.size + size > self.max_size {
            match inner.entries.pop_lru() {
                Some((evicted, slot)) => {
                    inner.size -= slot.size;
                    debug!(key = %evicted, size = slot.size, "memory store evicted entry");
                }
                None => break,
            }
        }

        let expires_at = self.clock.now().checked_add(options.ttl);
        inner.size += size;
        inner.entries.put(
            key.into_string(),
            Slot {
                entry,
                size,
                expires_at,
            },
        );
    }
}

impl CacheStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<CachedEntry>> {
        Box::pin(async move { Ok(self.lookup(key)) })
    }

    fn set(&self, key: CacheKey, entry: CachedEntry, options: SetOptions) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.insert(key, entry, options);
            Ok(())
        })
    }
}

// A panic while holding the lock leaves at worst a stale size count.
fn lock<'a>(mutex: &'a Mutex<Inner>, op: &'static str) -> MutexGuard<'a, Inner> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned memory store lock"
            );
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::http::{Headers, StatusCode};

    fn entry(body: &'static str) -> CachedEntry {
        CachedEntry::new(StatusCode::Ok, &Headers::new(), Bytes::from_static(body.as_bytes()))
    }

    fn key(key: &str) -> CacheKey {
        CacheKey::new(key).unwrap()
    }

    fn opts(size: usize, ttl_secs: u64) -> SetOptions {
        SetOptions {
            size_hint: size,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    fn store(max_size: usize) -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::at_millis(1_000));
        let store = MemoryStore::with_clock(max_size, clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn get_returns_live_entries() {
        let (_, store) = store(100);
        store.set(key("a"), entry("hello"), opts(5, 30)).await.unwrap();
        let found = store.get("a").await.unwrap().unwrap();
        assert_eq!(found.body(), &Bytes::from("hello"));
        assert!(store.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_expire_with_the_clock() {
        let (clock, store) = store(100);
        store.set(key("a"), entry("hello"), opts(5, 30)).await.unwrap();

        clock.advance(Duration::from_secs(29));
        assert!(store.get("a").await.unwrap().is_some());

        clock.advance(Duration::from_secs(1));
        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.size(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_is_never_served() {
        let (_, store) = store(100);
        store.set(key("a"), entry("hello"), opts(5, 0)).await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn least_recently_used_is_evicted_first() {
        let (_, store) = store(10);
        store.set(key("a"), entry("aaaa"), opts(4, 60)).await.unwrap();
        store.set(key("b"), entry("bbbb"), opts(4, 60)).await.unwrap();
        // Touch `a` so `b` becomes the eviction candidate.
        assert!(store.get("a").await.unwrap().is_some());

        store.set(key("c"), entry("cccc"), opts(4, 60)).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("b").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());
        assert_eq!(store.size(), 8);
    }

    #[tokio::test]
    async fn oversized_entries_are_not_stored() {
        let (_, store) = store(4);
        store.set(key("a"), entry("hello"), opts(5, 60)).await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.size(), 0);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let (_, store) = store(100);
        store.set(key("a"), entry("one"), opts(3, 60)).await.unwrap();
        store.set(key("a"), entry("three"), opts(5, 60)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.size(), 5);
        let found = store.get("a").await.unwrap().unwrap();
        assert_eq!(found.body(), &Bytes::from("three"));
    }

    #[test]
    fn sized_from_config() {
        let config = CacheConfig {
            max_size_bytes: 50,
            ..CacheConfig::default()
        };
        let store = MemoryStore::from_config(&config, Arc::new(SystemClock));
        assert_eq!(store.max_size, 50);
    }
}
