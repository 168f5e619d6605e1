//! Decides whether a stored representation still suits an incoming request.

use mime::Mime;

use super::entry::CachedEntry;
use super::negotiate;
use crate::http::Request;

/// Returns `true` when `entry` satisfies every content-negotiation header
/// the request sends.
///
/// Each rule applies only when both sides are present:
///
/// | entry header        | request header     |
/// |---------------------|--------------------|
/// | `content-type`      | `accept`           |
/// | charset of `content-type` | `accept-charset` |
/// | `content-encoding`  | `accept-encoding`  |
/// | `content-language`  | `accept-language`  |
///
/// A `content-type` that cannot be parsed fails the media-type rules; a
/// `content-type` without a charset skips the charset rule. A
/// `content-language` list passes if any of its languages is accepted.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rttp_cache::cache::{CachedEntry, is_applicable};
/// use rttp_cache::http::{Headers, Request, StatusCode};
///
/// let headers: Headers = [("content-type", "image/png")].into_iter().collect();
/// let entry = CachedEntry::new(StatusCode::Ok, &headers, Bytes::new());
/// let request = Request::get("/logo").header("Accept", "text/html,*/*;q=0.8");
///
/// assert!(is_applicable(&request, &entry));
/// ```
pub fn is_applicable(request: &Request, entry: &CachedEntry) -> bool {
    let wanted = request.headers();
    let stored = entry.headers();

    if let Some(content_type) = stored.get("content-type") {
        let accept = wanted.get("accept");
        let accept_charset = wanted.get("accept-charset");

        if accept.is_some() || accept_charset.is_some() {
            let Ok(media_type) = content_type.trim().parse::<Mime>() else {
                return false;
            };

            if let Some(accept) = accept {
                if !negotiate::accepts_media_type(accept, &media_type) {
                    return false;
                }
            }

            if let (Some(accept_charset), Some(charset)) =
                (accept_charset, media_type.get_param(mime::CHARSET))
            {
                if !negotiate::accepts_charset(accept_charset, charset.as_str()) {
                    return false;
                }
            }
        }
    }

    if let (Some(encoding), Some(accept_encoding)) =
        (stored.get("content-encoding"), wanted.get("accept-encoding"))
    {
        if !negotiate::accepts_encoding(accept_encoding, encoding.trim()) {
            return false;
        }
    }

    if let (Some(languages), Some(accept_language)) =
        (stored.get("content-language"), wanted.get("accept-language"))
    {
        let any_accepted = languages
            .split(',')
            .map(str::trim)
            .filter(|language| !language.is_empty())
            .any(|language| negotiate::accepts_language(accept_language, language));
        if !any_accepted {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::http::{Headers, StatusCode};

    const BROWSER_ACCEPT: &str =
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

    fn entry(pairs: &[(&str, &str)]) -> CachedEntry {
        let headers: Headers = pairs.iter().copied().collect();
        CachedEntry::new(StatusCode::Ok, &headers, Bytes::new())
    }

    fn request(pairs: &[(&str, &str)]) -> Request {
        pairs
            .iter()
            .fold(Request::get("/"), |req, (name, value)| req.header(*name, *value))
    }

    #[test]
    fn accept_matches_listed_type() {
        assert!(is_applicable(
            &request(&[("Accept", BROWSER_ACCEPT)]),
            &entry(&[("Content-Type", "text/html; charset=utf-8")]),
        ));
    }

    #[test]
    fn accept_matches_through_wildcard() {
        assert!(is_applicable(
            &request(&[("Accept", BROWSER_ACCEPT)]),
            &entry(&[("Content-Type", "image/png")]),
        ));
    }

    #[test]
    fn accept_rejects_unlisted_type() {
        assert!(!is_applicable(
            &request(&[("Accept", "image/png")]),
            &entry(&[("Content-Type", "application/json")]),
        ));
    }

    #[test]
    fn accept_charset() {
        let req = request(&[("Accept-Charset", "utf-8, iso-8859-1;q=0.2, utf-7;q=0.5")]);
        assert!(is_applicable(&req, &entry(&[("Content-Type", "text/html; charset=utf-8")])));

        let req = request(&[("Accept-Charset", "utf-8, iso-8859-1;q=0.2")]);
        assert!(!is_applicable(&req, &entry(&[("Content-Type", "text/html; charset=utf-7")])));
        assert!(is_applicable(&req, &entry(&[("Content-Type", "text/html")])));
    }

    #[test]
    fn accept_encoding() {
        let req = request(&[("Accept-Encoding", "gzip, deflate, sdch")]);
        assert!(is_applicable(&req, &entry(&[("Content-Encoding", "gzip")])));
        assert!(is_applicable(&req, &entry(&[])));
        assert!(!is_applicable(&req, &entry(&[("Content-Encoding", "hippos")])));
    }

    #[test]
    fn accept_language() {
        let req = request(&[("Accept-Language", "en-US,en;q=0.8")]);
        assert!(is_applicable(&req, &entry(&[("Content-Language", "en")])));
        assert!(is_applicable(&req, &entry(&[])));
        assert!(!is_applicable(&req, &entry(&[("Content-Language", "sp")])));
        assert!(is_applicable(&req, &entry(&[("Content-Language", "sp, en")])));
    }

    #[test]
    fn no_request_constraints_always_applies() {
        assert!(is_applicable(
            &request(&[]),
            &entry(&[("Content-Type", "not a media type"), ("Content-Encoding", "br")]),
        ));
    }

    #[test]
    fn unparseable_content_type_is_not_applicable() {
        assert!(!is_applicable(
            &request(&[("Accept", "*/*")]),
            &entry(&[("Content-Type", "not a media type")]),
        ));
    }
}
