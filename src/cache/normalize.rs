//! Cache header normalization for fresh responses.
//!
//! Runs once per response, before it is cached or sent, so that every stored
//! entry carries a consistent `cache-control` / `expires` / `date` triple.

use std::time::SystemTime;

use super::clock::{epoch_millis, from_epoch_millis};
use crate::http::Headers;

/// Lifetime used for `expires: Infinity`: 366 days.
pub const INFINITE_EXPIRY_MS: i64 = 31_622_400_000;

// Fri, 31 Dec 9999 23:59:59 GMT, the last instant an HTTP date can express.
const LAST_HTTP_DATE_MS: i64 = 253_402_300_799_000;

/// Fills in `cache-control`, `expires` and `date` on a fresh response.
///
/// The expiry delta is resolved from `expires` when present: `Infinity`
/// (case-insensitive) means [`INFINITE_EXPIRY_MS`], an integer is a delta in
/// milliseconds, and anything else is read as an HTTP date relative to `now`
/// (an unreadable date counts as already expired). Without `expires`, a `date`
/// header plus `estimated_interval_ms` gives the delta.
///
/// With a delta:
/// - a missing `cache-control` becomes `public, max-age=N, s-maxage=N`;
/// - `expires` is rewritten as the HTTP date `now + delta`, or the literal `0`
///   when the delta is not positive.
///
/// `date` is set to `now` only when absent. Running the function twice with
/// the same `now` leaves the headers unchanged the second time.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::{from_epoch_millis, normalize_headers};
/// use rttp_cache::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Expires", "600000");
/// normalize_headers(&mut headers, None, from_epoch_millis(1_451_610_000_000));
///
/// assert_eq!(headers.get("cache-control"), Some("public, max-age=600, s-maxage=600"));
/// assert_eq!(headers.get("expires"), Some("Fri, 01 Jan 2016 01:10:00 GMT"));
/// assert_eq!(headers.get("date"), Some("Fri, 01 Jan 2016 01:00:00 GMT"));
/// ```
pub fn normalize_headers(headers: &mut Headers, estimated_interval_ms: Option<u64>, now: SystemTime) {
    if let Some(delta) = resolve_delta(headers, estimated_interval_ms, now) {
        let delta = delta.min(LAST_HTTP_DATE_MS.saturating_sub(epoch_millis(now)));
        if !headers.contains("cache-control") {
            let secs = if delta > 0 { delta.saturating_add(500) / 1000 } else { 0 };
            headers.set(
                "cache-control",
                format!("public, max-age={secs}, s-maxage={secs}"),
            );
        }

        if delta > 0 {
            let expires = from_epoch_millis(epoch_millis(now).saturating_add(delta));
            headers.set("expires", httpdate::fmt_http_date(expires));
        } else {
            // RFC 9111 §5.3: "0" is the canonical already-expired value.
            headers.set("expires", "0");
        }
    }

    if !headers.contains("date") {
        headers.set("date", httpdate::fmt_http_date(now));
    }
}

fn resolve_delta(headers: &Headers, estimated_interval_ms: Option<u64>, now: SystemTime) -> Option<i64> {
    if let Some(expires) = headers.get("expires") {
        let expires = expires.trim();
        if expires.eq_ignore_ascii_case("infinity") {
            return Some(INFINITE_EXPIRY_MS);
        }
        if let Ok(millis) = expires.parse::<i64>() {
            return Some(millis);
        }
        return Some(match httpdate::parse_http_date(expires) {
            Ok(date) => epoch_millis(date).saturating_sub(epoch_millis(now)),
            Err(_) => 0,
        });
    }

    if headers.contains("date") {
        return estimated_interval_ms.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX));
    }

    None
}
