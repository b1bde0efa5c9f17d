//! In-memory storage backend.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::RwLock;

use super::{Cache, CacheError};
use crate::BoxFuture;

/// A [`Cache`] backed by a `HashMap` behind a read-write lock.
///
/// Unbounded on its own; wrap it in a [`BoundedCache`](super::BoundedCache)
/// to cap its size.
#[derive(Debug, Default)]
pub struct MemoryCache {
    items: RwLock<HashMap<String, Bytes>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl Cache for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, CacheError>> {
        Box::pin(async move { Ok(self.items.read().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: Bytes) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.items.write().await.insert(key.to_owned(), value);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.items.write().await.remove(key);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set("k", Bytes::from_static(b"v1")).await.unwrap();
        cache.set("k", Bytes::from_static(b"v2")).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some(&b"v2"[..]));
        assert_eq!(cache.len().await, 1);

        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert!(cache.is_empty().await);
    }
}
