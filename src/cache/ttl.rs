//! Cache lifetime extraction from response headers.

use std::time::SystemTime;

use super::clock::epoch_millis;
use super::control::CacheControl;
use super::error::TtlError;
use crate::http::Headers;

/// Computes how long a response may be cached, in milliseconds.
///
/// `cache-control` takes precedence over `expires` (RFC 9111 §5.3):
///
/// 1. With `cache-control`, `private`, `no-cache` and `no-store` yield `0`
///    (store the entry but treat it as already stale); otherwise `s-maxage`
///    seconds are used, and without it the lifetime is `0`.
/// 2. Without `cache-control`, `expires - now` is returned. The result is
///    negative for dates in the past; an unparseable date counts as already
///    expired.
/// 3. With neither header the lifetime cannot be determined.
///
/// # Errors
///
/// [`TtlError::CacheControl`] for a malformed `cache-control`,
/// [`TtlError::Undetermined`] when neither header is present.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::{extract_ttl, from_epoch_millis};
/// use rttp_cache::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Cache-Control", "public, max-age=3000, s-maxage=600");
/// let now = from_epoch_millis(1_451_610_000_000);
/// assert_eq!(extract_ttl(&headers, now).unwrap(), 600_000);
/// ```
pub fn extract_ttl(headers: &Headers, now: SystemTime) -> Result<i64, TtlError> {
    if let Some(value) = headers.get("cache-control") {
        let directives = CacheControl::parse(value)?;
        if directives.forbids_shared_reuse() {
            return Ok(0);
        }
        return Ok(directives
            .s_maxage()
            .map(|secs| i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX))
            .unwrap_or(0));
    }

    if let Some(value) = headers.get("expires") {
        return Ok(match httpdate::parse_http_date(value.trim()) {
            Ok(expires) => epoch_millis(expires) - epoch_millis(now),
            Err(_) => 0,
        });
    }

    Err(TtlError::Undetermined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::from_epoch_millis;

    const NOW: i64 = 1_451_610_000_000;

    fn ttl(pairs: &[(&str, &str)]) -> Result<i64, TtlError> {
        let headers: Headers = pairs.iter().copied().collect();
        extract_ttl(&headers, from_epoch_millis(NOW))
    }

    #[test]
    fn uses_s_maxage() {
        assert_eq!(
            ttl(&[("cache-control", "public, max-age=3000, s-maxage=600")]).unwrap(),
            600_000
        );
    }

    #[test]
    fn private_is_zero_not_an_error() {
        assert_eq!(
            ttl(&[("cache-control", "private, max-age=3000, s-maxage=600")]).unwrap(),
            0
        );
    }

    #[test]
    fn no_cache_and_no_store_are_zero() {
        assert_eq!(
            ttl(&[("cache-control", "no-cache, max-age=3000, s-maxage=600")]).unwrap(),
            0
        );
        assert_eq!(ttl(&[("cache-control", "no-store")]).unwrap(), 0);
    }

    #[test]
    fn without_s_maxage_is_zero() {
        assert_eq!(ttl(&[("cache-control", "public, max-age=3000")]).unwrap(), 0);
    }

    #[test]
    fn malformed_cache_control_is_an_error() {
        let err = ttl(&[("cache-control", "no-cache, max-age=b3000, s-maxage=s600")]).unwrap_err();
        assert!(matches!(err, TtlError::CacheControl(_)));
        assert!(err.to_string().contains("failed to parse cache control headers"));
    }

    #[test]
    fn cache_control_wins_over_expires() {
        assert_eq!(
            ttl(&[
                ("expires", "Sat, 02 Jan 2016 23:25:08 GMT"),
                ("cache-control", "public, s-maxage=5"),
            ])
            .unwrap(),
            5_000
        );
    }

    #[test]
    fn uses_expires() {
        assert_eq!(
            ttl(&[("expires", "Sat, 02 Jan 2016 23:25:08 GMT")]).unwrap(),
            167_108_000
        );
    }

    #[test]
    fn past_expires_is_negative() {
        assert_eq!(
            ttl(&[("expires", "Fri, 01 Jan 2016 00:59:50 GMT")]).unwrap(),
            -10_000
        );
    }

    #[test]
    fn unparseable_expires_is_already_expired() {
        assert_eq!(ttl(&[("expires", "0")]).unwrap(), 0);
    }

    #[test]
    fn nothing_to_go_on() {
        assert!(matches!(ttl(&[("etag", "\"x\"")]), Err(TtlError::Undetermined)));
    }
}
