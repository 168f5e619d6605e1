use super::error::BoxError;
use crate::http::Request;

/// The default cache key: method, normalized path and query string.
///
/// A trailing slash is ignored so `/docs` and `/docs/` share one entry; the
/// root path is kept as `/`.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::derive_key;
/// use rttp_cache::http::Request;
///
/// let key = derive_key(&Request::get("/search/?q=rust")).unwrap();
/// assert_eq!(key, "GET /search?q=rust");
/// ```
pub fn derive_key(request: &Request) -> Result<String, BoxError> {
    let path = request.path();
    let path = match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    };

    let mut key = format!("{} {path}", request.method());
    if let Some(query) = request.query_string() {
        key.push('?');
        key.push_str(query);
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;

    #[test]
    fn method_and_path() {
        assert_eq!(derive_key(&Request::get("/hello")).unwrap(), "GET /hello");
        assert_eq!(
            derive_key(&Request::new(Method::Head, "/hello")).unwrap(),
            "HEAD /hello"
        );
    }

    #[test]
    fn query_is_part_of_the_key() {
        assert_ne!(
            derive_key(&Request::get("/items?page=1")).unwrap(),
            derive_key(&Request::get("/items?page=2")).unwrap()
        );
    }

    #[test]
    fn trailing_slash_is_normalized() {
        assert_eq!(derive_key(&Request::get("/docs/")).unwrap(), "GET /docs");
        assert_eq!(derive_key(&Request::get("/")).unwrap(), "GET /");
    }
}
