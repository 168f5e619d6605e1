//! Proactive content negotiation over `Accept*` request headers (RFC 9110 §12.5).
//!
//! Each header is a comma-separated list of preferences with optional `q`
//! weights. For a given representation, the most specific preference that
//! matches it decides; ties go to the higher weight, then to the earlier
//! entry. The representation is acceptable when that weight is above zero.

use mime::Mime;

struct Preference<'a> {
    value: &'a str,
    q: f32,
}

// Elements with an unreadable weight are dropped.
fn preferences(header: &str) -> impl Iterator<Item = Preference<'_>> {
    header.split(',').filter_map(|element| {
        let mut parts = element.split(';');
        let value = parts.next()?.trim();
        if value.is_empty() {
            return None;
        }
        let mut q = 1.0;
        for param in parts {
            if let Some((name, raw)) = param.split_once('=') {
                if name.trim().eq_ignore_ascii_case("q") {
                    q = raw.trim().parse::<f32>().ok()?;
                }
            }
        }
        Some(Preference { value, q })
    })
}

// Candidates are `(weight, specificity)` pairs in header order; `None`
// specificity means the preference does not match at all.
fn accepted<I>(candidates: I) -> bool
where
    I: IntoIterator<Item = (f32, Option<u8>)>,
{
    let mut best: Option<(u8, f32)> = None;
    for (q, s) in candidates {
        let Some(s) = s else { continue };
        let better = match best {
            None => true,
            Some((best_s, best_q)) => s > best_s || (s == best_s && q > best_q),
        };
        if better {
            best = Some((s, q));
        }
    }
    best.is_some_and(|(_, q)| q > 0.0)
}

/// Whether `media_type` is acceptable under an `Accept` header.
///
/// Ranges rank `*/*` below `type/*` below `type/subtype`; a range carrying
/// parameters other than `q` only matches a media type with equal parameters.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::negotiate::accepts_media_type;
///
/// let png = "image/png".parse().unwrap();
/// assert!(accepts_media_type("text/html,*/*;q=0.8", &png));
/// assert!(!accepts_media_type("text/html, image/*;q=0", &png));
/// ```
pub fn accepts_media_type(accept: &str, media_type: &Mime) -> bool {
    accepted(accept.split(',').filter_map(|element| {
        let range = element.trim().parse::<Mime>().ok()?;
        let q = match range.params().find(|(name, _)| name.as_str() == "q") {
            Some((_, value)) => value.as_str().parse::<f32>().ok()?,
            None => 1.0,
        };
        Some((q, media_specificity(&range, media_type)))
    }))
}

fn media_specificity(range: &Mime, media_type: &Mime) -> Option<u8> {
    let mut s = 0;

    if range.type_() == media_type.type_() {
        s |= 4;
    } else if range.type_() != mime::STAR {
        return None;
    }

    if range.subtype() == media_type.subtype() {
        s |= 2;
    } else if range.subtype() != mime::STAR {
        return None;
    }

    let mut constrained = false;
    for (name, value) in range.params().filter(|(name, _)| name.as_str() != "q") {
        let matches = media_type.params().any(|(n, v)| {
            n.as_str() == name.as_str() && v.as_str().eq_ignore_ascii_case(value.as_str())
        });
        if !matches {
            return None;
        }
        constrained = true;
    }
    if constrained {
        s |= 1;
    }

    Some(s)
}

/// Whether `charset` is acceptable under an `Accept-Charset` header.
pub fn accepts_charset(accept_charset: &str, charset: &str) -> bool {
    accepted(preferences(accept_charset).map(|p| (p.q, token_specificity(p.value, charset))))
}

/// Whether `encoding` is acceptable under an `Accept-Encoding` header.
///
/// `identity` is acceptable unless the header refuses it, either by name or
/// through `*;q=0`.
pub fn accepts_encoding(accept_encoding: &str, encoding: &str) -> bool {
    let matches: Vec<_> = preferences(accept_encoding)
        .map(|p| (p.q, token_specificity(p.value, encoding)))
        .collect();

    if encoding.eq_ignore_ascii_case("identity") && matches.iter().all(|(_, s)| s.is_none()) {
        return true;
    }
    accepted(matches)
}

fn token_specificity(preference: &str, offered: &str) -> Option<u8> {
    if preference.eq_ignore_ascii_case(offered) {
        Some(1)
    } else if preference == "*" {
        Some(0)
    } else {
        None
    }
}

/// Whether `language` is acceptable under an `Accept-Language` header.
///
/// A preference matches on the full tag, or when one side's primary subtag
/// is the other's full tag (`en` and `en-US` match each other).
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::negotiate::accepts_language;
///
/// assert!(accepts_language("en-US,en;q=0.8", "en"));
/// assert!(accepts_language("en", "en-GB"));
/// assert!(!accepts_language("en-US,en;q=0.8", "sp"));
/// ```
pub fn accepts_language(accept_language: &str, language: &str) -> bool {
    accepted(preferences(accept_language).map(|p| (p.q, language_specificity(p.value, language))))
}

fn language_specificity(preference: &str, offered: &str) -> Option<u8> {
    let primary = |tag: &str| tag.split('-').next().unwrap_or(tag).to_ascii_lowercase();

    let preference_full = preference.to_ascii_lowercase();
    let offered_full = offered.to_ascii_lowercase();

    if preference_full == offered_full {
        Some(4)
    } else if primary(&preference_full) == offered_full {
        Some(2)
    } else if preference_full == primary(&offered_full) {
        Some(1)
    } else if preference_full == "*" {
        Some(0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER_ACCEPT: &str =
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

    fn mime(value: &str) -> Mime {
        value.parse().unwrap()
    }

    #[test]
    fn media_exact_and_wildcards() {
        assert!(accepts_media_type(BROWSER_ACCEPT, &mime("text/html; charset=utf-8")));
        assert!(accepts_media_type(BROWSER_ACCEPT, &mime("image/png")));
        assert!(!accepts_media_type("image/png", &mime("application/json")));
        assert!(accepts_media_type("text/*", &mime("text/css")));
    }

    #[test]
    fn most_specific_range_decides() {
        assert!(!accepts_media_type("*/*, text/html;q=0", &mime("text/html")));
        assert!(accepts_media_type("text/*;q=0, text/html", &mime("text/html")));
        assert!(!accepts_media_type("text/*;q=0, */*", &mime("text/css")));
    }

    #[test]
    fn media_range_parameters_must_match() {
        assert!(accepts_media_type("text/html;level=1", &mime("text/html; level=1")));
        assert!(!accepts_media_type("text/html;level=1", &mime("text/html")));
    }

    #[test]
    fn charsets() {
        assert!(accepts_charset("utf-8, iso-8859-1;q=0.2, utf-7;q=0.5", "utf-7"));
        assert!(!accepts_charset("utf-8, iso-8859-1;q=0.2", "utf-7"));
        assert!(accepts_charset("UTF-8", "utf-8"));
        assert!(accepts_charset("*", "koi8-r"));
        assert!(!accepts_charset("*, koi8-r;q=0", "koi8-r"));
    }

    #[test]
    fn encodings() {
        assert!(accepts_encoding("gzip, deflate, sdch", "gzip"));
        assert!(!accepts_encoding("gzip, deflate, sdch", "hippos"));
        assert!(accepts_encoding("gzip", "identity"));
        assert!(!accepts_encoding("gzip, identity;q=0", "identity"));
        assert!(!accepts_encoding("gzip, *;q=0", "identity"));
    }

    #[test]
    fn languages() {
        assert!(accepts_language("en-US,en;q=0.8", "en"));
        assert!(accepts_language("en-US", "en"));
        assert!(accepts_language("*", "fr"));
        assert!(!accepts_language("en-US,en;q=0.8", "sp"));
        assert!(!accepts_language("en;q=0", "en"));
    }

    #[test]
    fn unreadable_weights_are_ignored() {
        assert!(!accepts_charset("utf-8;q=abc", "utf-8"));
        assert!(accepts_charset("utf-8;q=abc, *", "utf-8"));
    }
}
