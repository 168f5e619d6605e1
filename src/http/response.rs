//! HTTP/1.1 response builder.
//!
//! Provides a fluent builder API for constructing HTTP responses and
//! serializing their head for transmission over TCP. Bodies are written
//! separately so streamed payloads can be forwarded chunk by chunk.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Body, Headers, StatusCode};

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use rttp_cache::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let (head, _body) = response.into_head();
/// let text = std::str::from_utf8(&head).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Body,
    keep_alive: bool,
}

/// The non-body half of a [`Response`], produced by [`Response::into_parts`].
#[derive(Debug, Clone)]
pub struct Parts {
    pub status: StatusCode,
    pub headers: Headers,
    pub keep_alive: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::empty(),
            keep_alive: true,
        }
    }

    /// Reassembles a response from its parts.
    pub fn from_parts(parts: Parts, body: Body) -> Self {
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
            keep_alive: parts.keep_alive,
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the whole header map.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a header in-place. Intended for middleware pipelines that receive
    /// a `Response` from downstream and need to decorate it without consuming it.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the response body from a string.
    ///
    /// The `Content-Length` header is written automatically by [`into_head`](Self::into_head).
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Body::full(body.into());
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::full(body);
        self
    }

    /// Sets a streamed (or pre-built) body.
    #[must_use]
    pub fn stream_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Controls whether the `Connection: keep-alive` or `Connection: close` header is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn header_map(&self) -> &Headers {
        &self.headers
    }

    /// Returns the response headers for in-place edits.
    pub fn header_map_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Splits the response into its head and body.
    pub fn into_parts(self) -> (Parts, Body) {
        (
            Parts {
                status: self.status,
                headers: self.headers,
                keep_alive: self.keep_alive,
            },
            self.body,
        )
    }

    /// Serializes the status line and headers into a `BytesMut` buffer using
    /// HTTP/1.1 wire format, and hands back the body for the caller to write.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain; charset=utf-8` if the body is non-empty and no
    ///   `Content-Type` header was set.
    /// - `Connection: keep-alive` or `Connection: close`.
    /// - `Content-Length: <n>` when the body length is known, otherwise
    ///   `Transfer-Encoding: chunked`.
    pub fn into_head(mut self) -> (BytesMut, Body) {
        let content_length = self.body.exact_len();

        if content_length != Some(0) && !self.headers.contains("content-type") {
            self.headers
                .insert("Content-Type", "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive {
            "keep-alive"
        } else {
            "close"
        };
        self.headers.set("Connection", connection);

        // Framing is owned by the server, never by the handler.
        self.headers.remove("content-length");
        self.headers.remove("transfer-encoding");

        let estimated_size = 128 + self.headers.len() * 64;
        let mut buf = BytesMut::with_capacity(estimated_size);

        // Status line
        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        // Headers
        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        // Framing is always the last header before the blank line
        match content_length {
            Some(len) => buf.put(format!("Content-Length: {len}\r\n").as_bytes()),
            None => buf.put(&b"Transfer-Encoding: chunked\r\n"[..]),
        }

        // Header/body separator
        buf.put(&b"\r\n"[..]);

        (buf, self.body)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}
