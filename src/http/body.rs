//! Response bodies: a fully buffered payload or an ordered stream of chunks.
//!
//! Handlers that know their whole payload up front use [`Body::full`]. Handlers
//! that produce output progressively either return a [`Stream`] through
//! [`Body::from_stream`] or write into the sending half of [`Body::channel`].
//! A streamed body ends exactly once: the stream yields `None` after its last
//! chunk, and the server writes the terminating frame only then.

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors produced while streaming a body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("body stream aborted before completion")]
    Aborted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A boxed, `Send` stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BodyError>> + Send>>;

/// Capacity of the channel returned by [`Body::channel`].
const CHANNEL_CAPACITY: usize = 16;

enum Kind {
    Full(Bytes),
    Stream {
        stream: BodyStream,
        // Exact number of bytes the stream will yield, when known.
        len: Option<usize>,
    },
}

/// An HTTP response body.
///
/// # Examples
///
/// ```
/// use rttp_cache::http::Body;
///
/// let body = Body::full("hello");
/// assert_eq!(body.exact_len(), Some(5));
///
/// let (_tx, streamed) = Body::channel();
/// assert_eq!(streamed.exact_len(), None);
/// ```
pub struct Body {
    kind: Kind,
}

impl Body {
    /// Creates an empty body.
    pub fn empty() -> Self {
        Self::full(Bytes::new())
    }

    /// Creates a body from a complete in-memory payload.
    pub fn full(bytes: impl Into<Bytes>) -> Self {
        Self {
            kind: Kind::Full(bytes.into()),
        }
    }

    /// Creates a body of unknown length from a stream of chunks.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BodyError>> + Send + 'static,
    {
        Self {
            kind: Kind::Stream {
                stream: Box::pin(stream),
                len: None,
            },
        }
    }

    /// Creates a streamed body whose total length is known in advance.
    pub fn from_stream_with_len<S>(stream: S, len: usize) -> Self
    where
        S: Stream<Item = Result<Bytes, BodyError>> + Send + 'static,
    {
        Self {
            kind: Kind::Stream {
                stream: Box::pin(stream),
                len: Some(len),
            },
        }
    }

    /// Creates a streamed body fed through a bounded channel.
    ///
    /// The body ends when the returned [`BodySender`] is dropped, or fails with
    /// [`BodyError::Aborted`] if [`BodySender::abort`] is called first.
    pub fn channel() -> (BodySender, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        (BodySender { tx }, Self::from_stream(stream))
    }

    /// Returns the exact number of bytes this body will produce, if known.
    pub fn exact_len(&self) -> Option<usize> {
        match &self.kind {
            Kind::Full(bytes) => Some(bytes.len()),
            Kind::Stream { len, .. } => *len,
        }
    }

    /// Returns `true` if the body is a buffered payload of zero bytes.
    pub fn is_empty(&self) -> bool {
        matches!(&self.kind, Kind::Full(bytes) if bytes.is_empty())
    }

    /// Converts the body into a chunk stream. Empty buffered bodies yield no chunks.
    pub fn into_stream(self) -> BodyStream {
        match self.kind {
            Kind::Full(bytes) if bytes.is_empty() => Box::pin(stream::empty()),
            Kind::Full(bytes) => Box::pin(stream::once(async move { Ok(bytes) })),
            Kind::Stream { stream, .. } => stream,
        }
    }

    /// Reads the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns the first [`BodyError`] produced by the underlying stream.
    pub async fn collect(self) -> Result<Bytes, BodyError> {
        let mut stream = match self.kind {
            Kind::Full(bytes) => return Ok(bytes),
            Kind::Stream { stream, .. } => stream,
        };
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::full(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::full(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::full(text)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            Kind::Stream { len, .. } => f.debug_struct("Body::Stream").field("len", len).finish(),
        }
    }
}

/// The writing half of [`Body::channel`].
#[derive(Debug)]
pub struct BodySender {
    tx: mpsc::Sender<Result<Bytes, BodyError>>,
}

impl BodySender {
    /// Sends the next chunk, waiting for capacity.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Aborted`] if the receiving body was dropped, which
    /// happens when the client goes away mid-response.
    pub async fn send(&self, chunk: impl Into<Bytes>) -> Result<(), BodyError> {
        self.tx
            .send(Ok(chunk.into()))
            .await
            .map_err(|_| BodyError::Aborted)
    }

    /// Terminates the body with an error instead of a clean end.
    pub async fn abort(self) {
        let _ = self.tx.send(Err(BodyError::Aborted)).await;
    }
}
