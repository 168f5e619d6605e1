//! `Cache-Control` header parsing.
//!
//! The grammar follows RFC 9111 §5.2: a comma-separated list of directives,
//! each a token optionally followed by `=` and a token or quoted string.
//! Empty list elements are ignored. Directive names are case-insensitive.

use thiserror::Error;

/// Why a `Cache-Control` value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid directive `{0}`")]
    InvalidDirective(String),

    #[error("unterminated quoted string")]
    UnterminatedQuote,

    #[error("directive `{name}` expects a number of seconds, got `{value}`")]
    InvalidSeconds { name: String, value: String },
}

/// A parsed `Cache-Control` header.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::CacheControl;
///
/// let cc = CacheControl::parse("public, max-age=3000, s-maxage=600").unwrap();
/// assert_eq!(cc.s_maxage(), Some(600));
/// assert_eq!(cc.max_age(), Some(3000));
/// assert!(!cc.forbids_shared_reuse());
///
/// assert!(CacheControl::parse("no-cache, max-age=b3000").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: Vec<(String, Option<String>)>,
}

impl CacheControl {
    /// Parses a header value.
    ///
    /// # Errors
    ///
    /// Fails on characters outside the token grammar, an unterminated quoted
    /// string, or a `max-age` / `s-maxage` whose value is not a whole number
    /// of seconds.
    pub fn parse(header: &str) -> Result<Self, ParseError> {
        let mut directives = Vec::new();

        for element in split_list(header)? {
            let element = element.trim();
            if element.is_empty() {
                continue;
            }

            let (name, value) = match element.split_once('=') {
                Some((name, raw)) => (name, Some(parse_value(element, raw)?)),
                None => (element, None),
            };
            if name.is_empty() || !name.bytes().all(is_tchar) {
                return Err(ParseError::InvalidDirective(element.to_owned()));
            }

            let name = name.to_ascii_lowercase();
            if matches!(name.as_str(), "max-age" | "s-maxage") {
                check_seconds(&name, value.as_deref())?;
            }
            directives.push((name, value));
        }

        Ok(Self { directives })
    }

    /// Returns `true` if the directive is present, with or without a value.
    pub fn has(&self, name: &str) -> bool {
        self.directives
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Returns the value of the first occurrence of a directive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.directives
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
    }

    /// `true` when `private` is present.
    pub fn is_private(&self) -> bool {
        self.has("private")
    }

    /// `true` when `no-cache` is present.
    pub fn no_cache(&self) -> bool {
        self.has("no-cache")
    }

    /// `true` when `no-store` is present.
    pub fn no_store(&self) -> bool {
        self.has("no-store")
    }

    /// `true` when a shared cache must treat the response as immediately stale.
    pub fn forbids_shared_reuse(&self) -> bool {
        self.is_private() || self.no_cache() || self.no_store()
    }

    /// The `max-age` directive, in seconds.
    pub fn max_age(&self) -> Option<u64> {
        self.seconds("max-age")
    }

    /// The `s-maxage` directive, in seconds.
    pub fn s_maxage(&self) -> Option<u64> {
        self.seconds("s-maxage")
    }

    fn seconds(&self, name: &str) -> Option<u64> {
        self.get(name)?.parse().ok()
    }
}

// RFC 9110 §5.6.2 token characters.
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

// Splits on commas that are not inside a quoted string.
fn split_list(header: &str) -> Result<Vec<&str>, ParseError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, b) in header.bytes().enumerate() {
        if in_quotes {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_quotes = true,
            b',' => {
                parts.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(ParseError::UnterminatedQuote);
    }
    parts.push(&header[start..]);
    Ok(parts)
}

fn parse_value(element: &str, raw: &str) -> Result<String, ParseError> {
    if let Some(quoted) = raw.strip_prefix('"') {
        let inner = quoted
            .strip_suffix('"')
            .ok_or(ParseError::UnterminatedQuote)?;
        let mut value = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => value.extend(chars.next()),
                c => value.push(c),
            }
        }
        return Ok(value);
    }

    if raw.is_empty() || !raw.bytes().all(is_tchar) {
        return Err(ParseError::InvalidDirective(element.to_owned()));
    }
    Ok(raw.to_owned())
}

fn check_seconds(name: &str, value: Option<&str>) -> Result<(), ParseError> {
    match value {
        Some(v) if !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) && v.parse::<u64>().is_ok() => {
            Ok(())
        }
        other => Err(ParseError::InvalidSeconds {
            name: name.to_owned(),
            value: other.unwrap_or_default().to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_directives() {
        let cc = CacheControl::parse("public, max-age=3000, s-maxage=600").unwrap();
        assert!(cc.has("public"));
        assert_eq!(cc.max_age(), Some(3000));
        assert_eq!(cc.s_maxage(), Some(600));
    }

    #[test]
    fn names_are_case_insensitive() {
        let cc = CacheControl::parse("Private, Max-Age=10").unwrap();
        assert!(cc.is_private());
        assert_eq!(cc.max_age(), Some(10));
    }

    #[test]
    fn quoted_values_may_contain_commas() {
        let cc = CacheControl::parse(r#"private="set-cookie, x-user", max-age=5"#).unwrap();
        assert_eq!(cc.get("private"), Some("set-cookie, x-user"));
        assert_eq!(cc.max_age(), Some(5));
    }

    #[test]
    fn empty_elements_are_skipped() {
        let cc = CacheControl::parse("no-store,, ,public").unwrap();
        assert!(cc.no_store());
        assert!(cc.has("public"));
    }

    #[test]
    fn rejects_non_numeric_ages() {
        let err = CacheControl::parse("no-cache, max-age=b3000, s-maxage=s600").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidSeconds {
                name: "max-age".into(),
                value: "b3000".into()
            }
        );
        assert!(CacheControl::parse("s-maxage=-1").is_err());
        assert!(CacheControl::parse("max-age").is_err());
    }

    #[test]
    fn rejects_bad_tokens() {
        assert!(CacheControl::parse("max age=5").is_err());
        assert!(CacheControl::parse("public; max-age=5").is_err());
        assert!(CacheControl::parse(r#"private="unterminated"#).is_err());
        assert!(CacheControl::parse("=5").is_err());
    }

    #[test]
    fn shared_reuse_forbidden_by_any_restricting_directive() {
        for header in ["private", "no-cache", "no-store", "public, no-store"] {
            assert!(CacheControl::parse(header).unwrap().forbids_shared_reuse(), "{header}");
        }
        assert!(!CacheControl::parse("public, s-maxage=1").unwrap().forbids_shared_reuse());
    }
}
