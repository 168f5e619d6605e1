//! # rttp-cache
//!
//! HTTP response caching for the rttp async HTTP/1.1 framework.
//!
//! Requests pass through [`cache::CacheMiddleware`], which serves stored
//! responses while they are fresh, answers conditional requests with
//! `304 Not Modified`, and records new `2xx` responses as they stream to the
//! client.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rttp_cache::cache::{CacheMiddleware, CacheOptions, MemoryStore};
//! use rttp_cache::middleware::{Pipeline, endpoint, from_middleware};
//! use rttp_cache::{Response, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = CacheMiddleware::new(CacheOptions::new(), Arc::new(MemoryStore::new(1 << 20)));
//!     let pipeline = Pipeline::new(vec![
//!         from_middleware(Arc::new(cache)),
//!         endpoint(|_ctx| async {
//!             Response::new(StatusCode::Ok)
//!                 .header("Expires", "60000")
//!                 .body("Hello, World!")
//!         }),
//!     ]);
//!
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     server
//!         .run(move |req| {
//!             let pipeline = pipeline.clone();
//!             async move { pipeline.handle(req).await }
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod context;
pub mod http;
pub mod middleware;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheMiddleware, CacheOptions, MemoryStore, ResponseCache};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
