//! Capture of a handler's response while it streams to the client.
//!
//! [`intercept`] decorates a finished handler [`Response`]: the head is
//! normalized in place, and the body is swapped for a stream that forwards
//! each chunk unchanged while keeping a copy. When the original body ends
//! cleanly the copy is handed to a completion callback, once, on its own task.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::runtime::Handle;

use bytes::{Bytes, BytesMut};
use futures::Stream;

use crate::http::{Body, BodyError, BodyStream, Headers, Response, StatusCode};

/// A response as it was delivered to the client.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub headers: Headers,
    pub body: Bytes,
}

/// Future returned by a completion callback.
pub type CompletionFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Receives the captured response after the last body chunk.
pub type OnComplete = Box<dyn FnOnce(CapturedResponse) -> CompletionFuture + Send>;

/// Installs capture on a handler response.
///
/// Responses outside `2xx` are returned untouched and `on_complete` is
/// dropped without being called. For `2xx` responses `normalize` runs on
/// the headers before anything is sent, then the body is wrapped:
///
/// - chunks reach the client in order and unmodified;
/// - a known body length is kept, so framing does not change;
/// - once the body ends, the stream reports its end at once and the future
///   returned by `on_complete` is spawned on the current Tokio runtime, so
///   the client never waits for it;
/// - a body error, or dropping the body early (client went away), means
///   `on_complete` never runs.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::intercept::{CapturedResponse, CompletionFuture, intercept};
/// use rttp_cache::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok).body("hello");
/// let response = intercept(
///     response,
///     |headers| headers.set("x-seen", "1"),
///     Box::new(|captured: CapturedResponse| -> CompletionFuture {
///         Box::pin(async move { assert_eq!(&captured.body[..], b"hello") })
///     }),
/// );
/// assert_eq!(response.header_map().get("x-seen"), Some("1"));
/// ```
pub fn intercept<N>(response: Response, normalize: N, on_complete: OnComplete) -> Response
where
    N: FnOnce(&mut Headers),
{
    if !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    normalize(&mut parts.headers);

    let len = body.exact_len();
    let tap = TapBody {
        inner: body.into_stream(),
        buf: BytesMut::with_capacity(len.unwrap_or(0)),
        pending: Some(Pending {
            status: parts.status,
            headers: parts.headers.clone(),
            on_complete,
        }),
        finished: false,
    };

    let body = match len {
        Some(len) => Body::from_stream_with_len(tap, len),
        None => Body::from_stream(tap),
    };
    Response::from_parts(parts, body)
}

struct Pending {
    status: StatusCode,
    headers: Headers,
    on_complete: OnComplete,
}

struct TapBody {
    inner: BodyStream,
    buf: BytesMut,
    // Taken when the completion is spawned, or discarded on error.
    pending: Option<Pending>,
    finished: bool,
}

impl Stream for TapBody {
    type Item = Result<Bytes, BodyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match ready!(this.inner.as_mut().poll_next(cx)) {
            Some(Ok(chunk)) => {
                if this.pending.is_some() {
                    this.buf.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(err)) => {
                if this.pending.take().is_some() {
                    tracing::warn!(error = %err, "response body failed, discarding capture");
                }
                this.buf = BytesMut::new();
                Poll::Ready(Some(Err(err)))
            }
            None => {
                this.finished = true;
                if let Some(pending) = this.pending.take() {
                    let captured = CapturedResponse {
                        status: pending.status,
                        headers: pending.headers,
                        body: std::mem::take(&mut this.buf).freeze(),
                    };
                    complete(pending.on_complete, captured);
                }
                Poll::Ready(None)
            }
        }
    }
}

fn complete(on_complete: OnComplete, captured: CapturedResponse) {
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(on_complete(captured));
        }
        Err(_) => tracing::warn!("no Tokio runtime to finish the capture on, discarding it"),
    }
}

impl Drop for TapBody {
    fn drop(&mut self) {
        if self.pending.is_some() {
            tracing::warn!(
                captured = self.buf.len(),
                "response body dropped before its end, discarding capture"
            );
        }
    }
}
