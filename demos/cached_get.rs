//! Fetches a URL twice through the cache and reports where each answer
//! came from.
//!
//! ```text
//! RUST_LOG=rttp_cache=debug cargo run --example cached_get -- http://127.0.0.1:8080/
//! ```
//!
//! An optional second argument is a JSON cache configuration file.

use rttp_cache::http::Request;
use rttp_cache::transport::{TcpTransport, Transport, X_FROM_CACHE};
use rttp_cache::CacheConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "http://127.0.0.1:8080/".to_owned());
    let config = match args.next() {
        Some(path) => CacheConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => CacheConfig::default(),
    };

    let client = config.build(TcpTransport::new());
    let request = Request::get(&url)?;

    for attempt in 1..=2 {
        let response = client.round_trip(&request).await?;
        println!(
            "#{attempt}: {} ({} bytes, {}: {})",
            response.status(),
            response.body_bytes().len(),
            X_FROM_CACHE,
            response.headers().get(X_FROM_CACHE).unwrap_or("-"),
        );
    }
    Ok(())
}
