//! Conditional-request evaluation against a stored entry.

use super::entry::CachedEntry;
use crate::http::Request;

/// Returns `true` when the client already holds the stored representation
/// and can be answered with `304 Not Modified`.
///
/// `if-modified-since` is checked first: the stored `date` must not be later
/// than it. Otherwise the stored `etag` must equal one of the `if-none-match`
/// tags byte for byte; weak tags never match. Anything unreadable counts as
/// "no match", so the full body is served.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rttp_cache::cache::{CachedEntry, is_exact_client_match};
/// use rttp_cache::http::{Headers, Request, StatusCode};
///
/// let headers: Headers = [("etag", "\"abc\"")].into_iter().collect();
/// let entry = CachedEntry::new(StatusCode::Ok, &headers, Bytes::new());
///
/// assert!(is_exact_client_match(&Request::get("/").header("If-None-Match", "\"abc\""), &entry));
/// assert!(!is_exact_client_match(&Request::get("/"), &entry));
/// ```
pub fn is_exact_client_match(request: &Request, entry: &CachedEntry) -> bool {
    let wanted = request.headers();
    let stored = entry.headers();

    if let (Some(date), Some(since)) = (stored.get("date"), wanted.get("if-modified-since")) {
        if let (Ok(date), Ok(since)) = (
            httpdate::parse_http_date(date.trim()),
            httpdate::parse_http_date(since.trim()),
        ) {
            if date <= since {
                return true;
            }
        }
    }

    if let (Some(etag), Some(if_none_match)) = (stored.get("etag"), wanted.get("if-none-match")) {
        let etag = etag.trim();
        if is_weak(etag) {
            return false;
        }
        return if_none_match
            .split(',')
            .map(str::trim)
            .any(|candidate| !is_weak(candidate) && candidate == etag);
    }

    false
}

fn is_weak(tag: &str) -> bool {
    tag.starts_with("W/")
}
