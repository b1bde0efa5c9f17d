//! Caching layer: the storage contract, the HTTP caching rules, and the
//! storage backends.
//!
//! ## Modules
//!
//! - [`directives`] — `Cache-Control` parsing.
//! - [`freshness`] — fresh / stale / transparent decisions.
//! - [`vary`] — `Vary` matching and the `X-Varied-*` shadow headers.
//! - [`clock`] — the injected time source used by [`freshness`].
//! - [`http_date`] — RFC 1123 dates.
//! - [`memory`], [`disk`] — storage backends.
//! - [`bounded`] — byte-capacity LRU decorator over any backend.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::BoxFuture;

pub mod bounded;
pub mod clock;
pub mod directives;
pub mod disk;
pub mod freshness;
pub mod http_date;
pub mod memory;
pub mod vary;

pub use bounded::BoundedCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use directives::CacheControl;
pub use disk::DiskCache;
pub use freshness::Freshness;
pub use memory::MemoryCache;

/// Errors reported by a storage backend.
///
/// The caching transport never surfaces these to its caller: a failed read
/// is a miss and a failed write or delete is logged and dropped.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Byte-blob key/value storage for serialized responses.
///
/// Implementations own their internal synchronization: every method may be
/// called concurrently from many tasks.
///
/// # Contract
///
/// - `get` of a missing key is `Ok(None)`, never an error.
/// - `set` overwrites silently; the value is visible to a `get` that starts
///   after `set` returns.
/// - `delete` is idempotent; deleting a missing key is `Ok(())`.
pub trait Cache: Send + Sync {
    /// Returns the bytes stored under `key`, if any.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, CacheError>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set<'a>(&'a self, key: &'a str, value: Bytes) -> BoxFuture<'a, Result<(), CacheError>>;

    /// Removes the value stored under `key`.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>>;
}

impl<C: Cache + ?Sized> Cache for Arc<C> {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, CacheError>> {
        (**self).get(key)
    }

    fn set<'a>(&'a self, key: &'a str, value: Bytes) -> BoxFuture<'a, Result<(), CacheError>> {
        (**self).set(key, value)
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        (**self).delete(key)
    }
}
