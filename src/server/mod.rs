//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and dispatches HTTP/1.1 requests to a handler function.
//! Supports HTTP/1.1 persistent connections (keep-alive) out of the box.
//!
//! Response bodies are written as they are produced: with `Content-Length`
//! when the body knows its size, with chunked transfer encoding otherwise.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use futures::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::{
    BodyError, StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// The rttp HTTP server.
///
/// Binds to a TCP address and dispatches incoming HTTP/1.1 requests to a
/// handler function.
///
/// # Examples
///
/// ```rust,no_run
/// use rttp_cache::server::Server;
/// use rttp_cache::http::{Request, Response, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server.run(|_req| async {
///         Response::new(StatusCode::Ok).body("Hello!")
///     }).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections and dispatching requests to `handler`.
    ///
    /// The handler receives a [`Request`] and must return a [`Future`] that
    /// resolves to a [`Response`]. The handler is wrapped in an [`Arc`] and
    /// shared across all spawned Tokio tasks, so it must be `Send + Sync + 'static`.
    ///
    /// This method runs until the process is terminated or an unrecoverable
    /// listener error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let handler = Arc::new(handler);
        info!(address = %self.local_addr, "rttp listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, handler).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// HTTP/1.1 connections are persistent by default: we loop, reading one
/// request per iteration, until the peer closes the connection or signals
/// `Connection: close`.
async fn handle_connection<H, F>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
) -> Result<(), std::io::Error>
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let bytes_read = stream.read_buf(&mut buf).await?;

        if bytes_read == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }

        // Guard against excessively large requests.
        if buf.len() > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "request too large, sending 413");
            let response = Response::new(StatusCode::PayloadTooLarge)
                .body("Request entity too large")
                .keep_alive(false);
            write_response(&mut stream, response).await?;
            break;
        }

        // Attempt to parse the buffered data as an HTTP request.
        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                // Headers not yet fully received; read more data.
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                let response = Response::new(StatusCode::BadRequest)
                    .body(format!("Bad Request: {e}"))
                    .keep_alive(false);
                write_response(&mut stream, response).await?;
                break;
            }
        };

        // Wait for the full body to arrive if Content-Length is set.
        let content_length = request.content_length().unwrap_or(0);
        let total_needed = body_offset + content_length;
        if buf.len() < total_needed {
            continue;
        }

        let keep_alive = request.is_keep_alive();

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let mut response = handler(request).await;
        if !keep_alive {
            response = response.keep_alive(false);
        }
        write_response(&mut stream, response).await?;

        // Drop the consumed request bytes from the buffer.
        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close, shutting down");
            break;
        }
    }

    Ok(())
}

/// Writes the head, then every body chunk, then flushes.
///
/// A body that fails mid-way cannot be reported to the client any more, so
/// the connection is torn down instead. Returning early drops the rest of
/// the body, which is how producers learn the client went away.
async fn write_response<W>(out: &mut W, response: Response) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let (head, body) = response.into_head();
    let chunked = body.exact_len().is_none();
    out.write_all(&head).await?;

    let mut chunks = body.into_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(into_io)?;
        if chunk.is_empty() {
            continue;
        }
        if chunked {
            out.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).await?;
            out.write_all(&chunk).await?;
            out.write_all(b"\r\n").await?;
        } else {
            out.write_all(&chunk).await?;
        }
    }

    if chunked {
        out.write_all(b"0\r\n\r\n").await?;
    }
    out.flush().await
}

fn into_io(err: BodyError) -> std::io::Error {
    match err {
        BodyError::Io(err) => err,
        other => std::io::Error::new(std::io::ErrorKind::ConnectionAborted, other),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::stream;

    use super::*;
    use crate::http::Body;

    async fn written(response: Response) -> Result<String, std::io::Error> {
        let mut out = Vec::new();
        write_response(&mut out, response).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn fixed_length_body() {
        let text = written(Response::new(StatusCode::Ok).body("hello")).await.unwrap();
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nhello"));
    }

    #[tokio::test]
    async fn streamed_body_is_chunk_encoded() {
        let chunks = stream::iter(vec![
            Ok::<_, BodyError>(Bytes::from("hello ")),
            Ok(Bytes::new()),
            Ok(Bytes::from("world")),
        ]);
        let response = Response::new(StatusCode::Ok).stream_body(Body::from_stream(chunks));
        let text = written(response).await.unwrap();
        assert!(text.contains("Transfer-Encoding: chunked\r\n"));
        assert!(text.ends_with("\r\n\r\n6\r\nhello \r\n5\r\nworld\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn captured_body_is_terminated_before_the_capture_finishes() {
        use crate::cache::intercept::{CapturedResponse, CompletionFuture, intercept};

        let chunks = stream::iter(vec![Ok::<_, BodyError>(Bytes::from("hello"))]);
        let response = Response::new(StatusCode::Ok).stream_body(Body::from_stream(chunks));
        let response = intercept(
            response,
            |_| {},
            Box::new(|_: CapturedResponse| -> CompletionFuture { Box::pin(std::future::pending()) }),
        );

        let text = written(response).await.unwrap();
        assert!(text.ends_with("5\r\nhello\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn failing_body_aborts_the_write() {
        let chunks = stream::iter(vec![Ok(Bytes::from("part")), Err(BodyError::Aborted)]);
        let response = Response::new(StatusCode::Ok).stream_body(Body::from_stream(chunks));
        let err = written(response).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionAborted);
    }
}
