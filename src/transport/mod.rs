//! Request transports, anything that turns a [`Request`] into a [`Response`].
//!
//! - [`Transport`] — the trait every layer implements.
//! - [`TcpTransport`] — plain HTTP/1.1 over a Tokio TCP connection.
//! - [`CachingTransport`] — wraps another transport with the response cache.

use std::sync::Arc;

use thiserror::Error;

use crate::BoxFuture;
use crate::http::{Request, Response, response::ResponseError};

pub mod caching;
pub mod tcp;

pub use caching::{CacheStatus, CachingTransport, X_FROM_CACHE};
pub use tcp::TcpTransport;

/// Errors produced while performing a request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("request URL has no host")]
    MissingHost,

    #[error("response exceeds maximum allowed size of {max_bytes} bytes")]
    ResponseTooLarge { max_bytes: usize },

    #[error("malformed response: {0}")]
    Response(#[from] ResponseError),
}

/// Performs one HTTP request/response exchange.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync`; a single transport is shared
///   by every in-flight request.
/// - Errors are returned as-is to the caller; layers above do not retry.
pub trait Transport: Send + Sync {
    fn round_trip<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, TransportError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn round_trip<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, TransportError>> {
        (**self).round_trip(request)
    }
}
