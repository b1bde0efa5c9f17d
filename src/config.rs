//! Cache configuration loaded from JSON.
//!
//! ```json
//! {
//!   "mark_cached_responses": true,
//!   "capacity_bytes": 10485760,
//!   "disk_path": "/var/cache/rttp"
//! }
//! ```
//!
//! Every field is optional. Without `disk_path` entries live in memory;
//! without `capacity_bytes` storage is unbounded.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::cache::{BoundedCache, Cache, DiskCache, MemoryCache};
use crate::transport::{CachingTransport, Transport};

/// Errors that can occur while loading a [`CacheConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid cache configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Add `X-From-Cache: 1` to responses answered from storage.
    pub mark_cached_responses: bool,
    /// Payload byte budget; least recently used entries are evicted past it.
    pub capacity_bytes: Option<usize>,
    /// Directory for on-disk entries.
    pub disk_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mark_cached_responses: true,
            capacity_bytes: None,
            disk_path: None,
        }
    }
}

impl CacheConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed JSON, wrongly typed
    /// values, or unknown fields.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the configured storage stack.
    pub fn build_store(&self) -> Arc<dyn Cache> {
        let backend: Arc<dyn Cache> = match &self.disk_path {
            Some(path) => Arc::new(DiskCache::new(path.clone())),
            None => Arc::new(MemoryCache::new()),
        };
        debug!(
            disk = ?self.disk_path,
            capacity_bytes = ?self.capacity_bytes,
            "building cache store"
        );

        match self.capacity_bytes {
            Some(capacity) => Arc::new(BoundedCache::new(backend, capacity)),
            None => backend,
        }
    }

    /// Wraps `transport` with a cache built from this configuration.
    pub fn build<T: Transport>(&self, transport: T) -> CachingTransport<T, Arc<dyn Cache>> {
        CachingTransport::with_config(transport, self.build_store(), self)
    }
}
