//! Per-request context handed through the middleware pipeline.

use crate::Request;

/// Per-request context. Owns the parsed request for the lifetime of one
/// pass through the middleware stack.
#[derive(Debug)]
pub struct Context {
    request: Request,
}

impl Context {
    /// Create a new context from a request
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Consumes the context, returning the request.
    pub fn into_request(self) -> Request {
        self.request
    }
}

impl From<Request> for Context {
    fn from(request: Request) -> Self {
        Self::new(request)
    }
}
