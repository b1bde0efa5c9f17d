//! # rttp-cache
//!
//! A private HTTP/1.1 response cache for async clients, written in Rust.
//!
//! Wrap any [`Transport`](transport::Transport) in a
//! [`CachingTransport`](transport::CachingTransport) and fresh responses are
//! answered from storage, stale ones are revalidated with conditional
//! requests, and everything else goes to the network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rttp_cache::http::Request;
//! use rttp_cache::transport::{CachingTransport, TcpTransport, Transport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CachingTransport::in_memory(TcpTransport::new());
//!     let request = Request::get("http://127.0.0.1:8080/")?;
//!
//!     let response = client.round_trip(&request).await?;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod cache;
pub mod config;
pub mod http;
pub mod transport;

/// Boxed future returned by the object-safe async traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{BoundedCache, Cache, CacheError, DiskCache, MemoryCache};
pub use config::{CacheConfig, ConfigError};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use transport::{CacheStatus, CachingTransport, TcpTransport, Transport, TransportError};
