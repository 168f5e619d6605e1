//! A small server with response caching in front of two routes.
//!
//! ```text
//! RUST_LOG=debug cargo run --example demo_server
//! curl -i http://127.0.0.1:9001/hello   # cached for 30 seconds
//! curl -i http://127.0.0.1:9001/world   # cached for 10 seconds, streamed
//! ```
//!
//! Settings can be overridden with a JSON document in `RTTP_CACHE_CONFIG`,
//! e.g. `{"max_size_bytes": 50, "estimated_interval_ms": 5000}`.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rttp_cache::cache::{CacheConfig, CacheMiddleware, CacheOptions, MemoryStore, SystemClock};
use rttp_cache::http::Body;
use rttp_cache::middleware::{LoggerMiddleware, Pipeline, endpoint, from_middleware};
use rttp_cache::{Response, Server, StatusCode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match std::env::var("RTTP_CACHE_CONFIG") {
        Ok(json) => CacheConfig::from_json(&json)?,
        Err(_) => CacheConfig {
            max_size_bytes: 50,
            ..CacheConfig::default()
        },
    };

    let clock = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::from_config(&config, clock.clone()));
    let cache = CacheMiddleware::new(CacheOptions::from_config(&config).clock(clock), store);

    let pipeline = Pipeline::new(vec![
        from_middleware(Arc::new(LoggerMiddleware)),
        from_middleware(Arc::new(cache)),
        endpoint(|ctx| async move {
            match ctx.request().path() {
                "/hello" => hello(),
                "/world" => world(),
                _ => Response::new(StatusCode::NotFound).body("Not Found"),
            }
        }),
    ]);

    let server = Server::bind("127.0.0.1:9001").await?;
    tracing::info!(address = %server.local_addr(), "demo server with caching started");

    server
        .run(move |request| {
            let pipeline = pipeline.clone();
            async move { pipeline.handle(request).await }
        })
        .await?;
    Ok(())
}

fn hello() -> Response {
    let now = SystemTime::now();
    Response::new(StatusCode::Ok)
        .header("Expires", httpdate::fmt_http_date(now + Duration::from_secs(30)))
        .body(format!("Hello! {}", httpdate::fmt_http_date(now)))
}

// Streams its body so the cache has to assemble it from chunks.
fn world() -> Response {
    let (tx, body) = Body::channel();
    tokio::spawn(async move {
        for part in ["World! ", "from ", "a stream"] {
            if tx.send(part).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    Response::new(StatusCode::Ok)
        .header("Expires", "10000")
        .header("Content-Type", "text/plain; charset=utf-8")
        .stream_body(body)
}
