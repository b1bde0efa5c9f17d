//! Byte-capacity LRU decorator over any [`Cache`].
//!
//! The decorator keeps only an index of `key → payload size` in recency
//! order; the bytes stay in the wrapped store. Eviction is decided while
//! holding the index lock, and the resulting deletes and the write itself
//! run after the lock is released so a slow backend never stalls unrelated
//! cache traffic.
//!
//! Because index updates and backing-store I/O are not atomic together, two
//! concurrent writes of the same key may reach the store in either order;
//! the last one to land wins.

use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use lru::LruCache;
use tracing::{trace, warn};

use super::{Cache, CacheError};
use crate::BoxFuture;

/// Wraps a [`Cache`] and evicts least-recently-used entries once the stored
/// payload bytes exceed `capacity`.
///
/// Only value bytes count toward the budget; keys and bookkeeping do not. A
/// single entry larger than the whole capacity is still kept, as the sole
/// tracked entry, until something else is stored.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use rttp_cache::cache::{BoundedCache, Cache, MemoryCache};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = BoundedCache::new(MemoryCache::new(), 8);
/// cache.set("a", Bytes::from_static(b"1234")).await.unwrap();
/// cache.set("b", Bytes::from_static(b"1234")).await.unwrap();
/// cache.set("c", Bytes::from_static(b"1234")).await.unwrap();
///
/// assert_eq!(cache.get("a").await.unwrap(), None);
/// assert_eq!(cache.used_bytes(), 8);
/// # }
/// ```
#[derive(Debug)]
pub struct BoundedCache<C> {
    inner: C,
    capacity: usize,
    index: Mutex<Index>,
}

#[derive(Debug)]
struct Index {
    sizes: LruCache<String, usize>,
    // Signed: a single oversized entry may push it below zero.
    remaining: i64,
}

impl<C: Cache> BoundedCache<C> {
    /// Wraps `inner` with a budget of `capacity` payload bytes.
    pub fn new(inner: C, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            index: Mutex::new(Index {
                sizes: LruCache::unbounded(),
                remaining: byte_count(capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Payload bytes currently accounted for.
    pub fn used_bytes(&self) -> usize {
        let remaining = self.lock().remaining;
        usize::try_from(byte_count(self.capacity) - remaining).unwrap_or(0)
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.lock().sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().sizes.is_empty()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn lock(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Promotes `key` to most recently used. Returns `false` if untracked.
    fn touch(&self, key: &str) -> bool {
        self.lock().sizes.get(key).is_some()
    }

    /// Records `key` at `size` bytes and picks the victims needed to get
    /// back under budget.
    fn admit(&self, key: &str, size: usize) -> Vec<String> {
        let mut guard = self.lock();
        let index = &mut *guard;

        let previous = index.sizes.put(key.to_owned(), size).unwrap_or(0);
        index.remaining -= byte_count(size) - byte_count(previous);

        let mut victims = Vec::new();
        while index.remaining < 0 && index.sizes.len() > 1 {
            match index.sizes.pop_lru() {
                Some((victim, victim_size)) => {
                    index.remaining += byte_count(victim_size);
                    trace!(key = %victim, size = victim_size, "evicting least recently used entry");
                    victims.push(victim);
                }
                None => break,
            }
        }
        victims
    }

    fn forget(&self, key: &str) {
        let mut guard = self.lock();
        let index = &mut *guard;
        if let Some(size) = index.sizes.pop(key) {
            index.remaining += byte_count(size);
        }
    }
}

impl<C: Cache> Cache for BoundedCache<C> {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, CacheError>> {
        Box::pin(async move {
            if !self.touch(key) {
                return Ok(None);
            }
            self.inner.get(key).await
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Bytes) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let victims = self.admit(key, value.len());
            for victim in &victims {
                if let Err(e) = self.inner.delete(victim).await {
                    warn!(key = %victim, error = %e, "failed to delete evicted entry");
                }
            }
            self.inner.set(key, value).await
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.forget(key);
            self.inner.delete(key).await
        })
    }
}

fn byte_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::MemoryCache;

    fn bytes(n: usize) -> Bytes {
        Bytes::from(vec![b'x'; n])
    }

    #[tokio::test]
    async fn round_trip_is_byte_identical() {
        let cache = BoundedCache::new(MemoryCache::new(), 1024);
        let payload = Bytes::from_static(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
        cache.set("k", payload.clone()).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(payload.clone()));
        assert_eq!(cache.used_bytes(), payload.len());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn overwrite_accounts_the_delta() {
        let cache = BoundedCache::new(MemoryCache::new(), 100);
        cache.set("k", bytes(40)).await.unwrap();
        cache.set("k", bytes(10)).await.unwrap();
        assert_eq!(cache.used_bytes(), 10);
        cache.set("k", bytes(70)).await.unwrap();
        assert_eq!(cache.used_bytes(), 70);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let store = Arc::new(MemoryCache::new());
        let cache = BoundedCache::new(Arc::clone(&store), 10);

        cache.set("a", bytes(4)).await.unwrap();
        cache.set("b", bytes(4)).await.unwrap();
        cache.set("c", bytes(4)).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(cache.used_bytes(), 8);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn get_protects_from_eviction() {
        let store = Arc::new(MemoryCache::new());
        let cache = BoundedCache::new(Arc::clone(&store), 10);

        cache.set("a", bytes(4)).await.unwrap();
        cache.set("b", bytes(4)).await.unwrap();
        cache.set("c", bytes(4)).await.unwrap(); // evicts a

        assert!(cache.get("b").await.unwrap().is_some());
        cache.set("d", bytes(4)).await.unwrap(); // evicts c, not b

        assert!(cache.get("b").await.unwrap().is_some());
        assert!(cache.get("d").await.unwrap().is_some());
        assert_eq!(store.get("c").await.unwrap(), None);
        assert_eq!(cache.used_bytes(), 8);
    }

    #[tokio::test]
    async fn oversized_entry_is_kept_alone() {
        let cache = BoundedCache::new(MemoryCache::new(), 10);
        cache.set("a", bytes(4)).await.unwrap();
        cache.set("big", bytes(25)).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("big").await.unwrap().map(|b| b.len()), Some(25));
        assert_eq!(cache.used_bytes(), 25);

        cache.set("small", bytes(2)).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), 2);
    }

    #[tokio::test]
    async fn delete_credits_capacity() {
        let store = Arc::new(MemoryCache::new());
        let cache = BoundedCache::new(Arc::clone(&store), 10);
        cache.set("a", bytes(6)).await.unwrap();
        cache.delete("a").await.unwrap();
        cache.delete("a").await.unwrap();

        assert_eq!(cache.used_bytes(), 0);
        assert!(cache.is_empty());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn untracked_key_is_not_read_through() {
        let store = Arc::new(MemoryCache::new());
        store.set("outside", bytes(3)).await.unwrap();
        let cache = BoundedCache::new(Arc::clone(&store), 10);
        assert_eq!(cache.get("outside").await.unwrap(), None);
    }

    /// Tracked sizes sum to the accounted usage, and the budget holds
    /// unless a single entry is tracked.
    fn assert_accounting(cache: &BoundedCache<MemoryCache>) {
        let index = cache.lock();
        let tracked: usize = index.sizes.iter().map(|(_, size)| *size).sum();
        assert_eq!(byte_count(cache.capacity) - index.remaining, byte_count(tracked));
        assert!(index.remaining >= 0 || index.sizes.len() <= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_traffic_keeps_accounting_consistent() {
        let cache = Arc::new(BoundedCache::new(MemoryCache::new(), 64));

        let mut tasks = Vec::new();
        for worker in 0..8usize {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                for i in 0..200usize {
                    let key = format!("k{}", (worker * 7 + i) % 16);
                    match i % 4 {
                        0 | 1 => cache.set(&key, bytes(1 + (worker + i) % 12)).await.unwrap(),
                        2 => {
                            cache.get(&key).await.unwrap();
                        }
                        _ => cache.delete(&key).await.unwrap(),
                    }
                    assert_accounting(&cache);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_accounting(&cache);
        assert!(cache.used_bytes() <= cache.capacity());
        assert!(cache.len() <= 16);
    }

    #[tokio::test]
    async fn tracked_but_missing_reads_as_not_found() {
        let store = Arc::new(MemoryCache::new());
        let cache = BoundedCache::new(Arc::clone(&store), 10);
        cache.set("a", bytes(3)).await.unwrap();
        store.delete("a").await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.len(), 1);
    }
}
