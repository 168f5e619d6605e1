//! The stored form of a cached response and the key it is stored under.

use std::fmt;

use bytes::Bytes;

use super::error::CacheError;
use crate::http::{Body, Headers, Response, StatusCode};

/// Headers that describe the framing of one particular transfer. They are
/// recomputed by the server on every replay and never stored.
const HOP_BY_HOP: [&str; 4] = ["connection", "keep-alive", "transfer-encoding", "content-length"];

/// Headers a `304 Not Modified` carries over from the stored response
/// (RFC 9110 §15.4.5).
const NOT_MODIFIED_HEADERS: [&str; 6] = [
    "cache-control",
    "content-location",
    "date",
    "etag",
    "expires",
    "vary",
];

/// A non-empty string identifying one cacheable response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validates a key produced by a key-derivation hook.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidKey`] if `key` is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, CacheError> {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A captured 2xx response as held by a [`CacheStore`](super::CacheStore).
///
/// Header names are lowercase. Cloning shares the body buffer.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rttp_cache::cache::CachedEntry;
/// use rttp_cache::http::{Headers, StatusCode};
///
/// let headers: Headers = [("ETag", "\"abc\""), ("Content-Length", "2")].into_iter().collect();
/// let entry = CachedEntry::new(StatusCode::Ok, &headers, Bytes::from_static(b"hi"));
///
/// assert_eq!(entry.headers().get("etag"), Some("\"abc\""));
/// assert!(!entry.headers().contains("content-length"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl CachedEntry {
    pub fn new(status: StatusCode, headers: &Headers, body: Bytes) -> Self {
        let mut headers = headers.to_lowercase_names();
        for name in HOP_BY_HOP {
            headers.remove(name);
        }
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Size of the stored body in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Rebuilds the full stored response.
    pub fn to_response(&self) -> Response {
        Response::new(self.status)
            .headers(self.headers.clone())
            .stream_body(Body::full(self.body.clone()))
    }

    /// Builds an empty `304 Not Modified` carrying the entry's validators.
    pub fn to_not_modified(&self) -> Response {
        let headers = self
            .headers
            .iter()
            .filter(|(name, _)| NOT_MODIFIED_HEADERS.contains(name))
            .collect();
        Response::new(StatusCode::NotModified).headers(headers)
    }
}
