//! The caching transport: serve, revalidate, or forward.
//!
//! For every request [`CachingTransport`] decides one of:
//!
//! | Outcome                                  | [`CacheStatus`]                     |
//! |------------------------------------------|-------------------------------------|
//! | fresh entry returned, no network         | [`HitFresh`](CacheStatus::HitFresh) |
//! | stale entry, conditional request sent    | [`HitStaleRevalidate`](CacheStatus::HitStaleRevalidate) |
//! | entry exists but `Vary` does not match   | [`HitVaryMismatch`](CacheStatus::HitVaryMismatch) |
//! | no usable entry                          | [`Miss`](CacheStatus::Miss)         |
//! | method or directives bypass the cache    | [`Uncacheable`](CacheStatus::Uncacheable) |
//!
//! Responses served from storage carry `X-From-Cache: 1`. That header is
//! never written to storage.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{Transport, TransportError};
use crate::BoxFuture;
use crate::cache::clock::{Clock, SystemClock};
use crate::cache::directives::{CacheControl, NO_STORE, ONLY_IF_CACHED};
use crate::cache::freshness::{self, Freshness};
use crate::cache::vary::{record_varied, vary_matches};
use crate::cache::{Cache, MemoryCache};
use crate::config::CacheConfig;
use crate::http::headers::canonical_name;
use crate::http::{Headers, Method, Request, Response, StatusCode};

/// Header added to responses that were answered from storage.
pub const X_FROM_CACHE: &str = "X-From-Cache";

/// Always hop-by-hop, in addition to whatever a response's `Connection`
/// header names.
const HOP_BY_HOP: [&str; 8] = [
    "Connection",
    "Keep-Alive",
    "Proxy-Authenticate",
    "Proxy-Authorization",
    "Te",
    "Trailers",
    "Transfer-Encoding",
    "Upgrade",
];

/// Headers a 304 updates on the stored response so the refreshed entry is
/// judged by the new freshness information.
const REFRESHED_ON_304: [&str; 5] = ["Date", "Expires", "Cache-Control", "Etag", "Last-Modified"];

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Miss,
    HitFresh,
    HitStaleRevalidate,
    HitVaryMismatch,
    Uncacheable,
}

/// A [`Transport`] that answers from a [`Cache`] when it safely can.
///
/// Fresh entries are returned without touching the network. Stale entries
/// are revalidated with `If-None-Match` / `If-Modified-Since`; a `304 Not
/// Modified` is spliced onto the stored response and returned as `200 OK`.
/// Everything else goes to the wrapped transport, and storable results are
/// written back.
///
/// This is a *private* cache: `public`, `private` and `s-maxage` carry no
/// meaning, and a request's `max-stale` is not honored.
///
/// # Examples
///
/// ```rust,no_run
/// use rttp_cache::http::Request;
/// use rttp_cache::transport::{CachingTransport, TcpTransport, Transport};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = CachingTransport::in_memory(TcpTransport::new());
///     let request = Request::get("http://127.0.0.1:8080/feed")?;
///
///     let first = client.round_trip(&request).await?;
///     let second = client.round_trip(&request).await?;
///     println!("{:?} then {:?}", first.headers().get("x-from-cache"), second.headers().get("x-from-cache"));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct CachingTransport<T, C> {
    transport: T,
    cache: C,
    clock: Arc<dyn Clock>,
    mark_cached_responses: bool,
}

impl<T: Transport> CachingTransport<T, MemoryCache> {
    /// Caches into a fresh, unbounded [`MemoryCache`].
    pub fn in_memory(transport: T) -> Self {
        Self::new(transport, MemoryCache::new())
    }
}

impl<T: Transport, C: Cache> CachingTransport<T, C> {
    /// Wraps `transport`, storing responses in `cache`. Uses the system
    /// clock and marks cached responses.
    pub fn new(transport: T, cache: C) -> Self {
        Self {
            transport,
            cache,
            clock: Arc::new(SystemClock),
            mark_cached_responses: true,
        }
    }

    /// Applies the transport-level settings of `config`.
    pub fn with_config(transport: T, cache: C, config: &CacheConfig) -> Self {
        Self::new(transport, cache).mark_cached_responses(config.mark_cached_responses)
    }

    /// Replaces the time source used for freshness decisions.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Controls whether responses from storage get `X-From-Cache: 1`.
    #[must_use]
    pub fn mark_cached_responses(mut self, mark: bool) -> Self {
        self.mark_cached_responses = mark;
        self
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Performs `request` and reports how the cache answered it.
    ///
    /// # Errors
    ///
    /// Only errors of the wrapped transport are returned; storage failures
    /// degrade to misses.
    pub async fn round_trip_with_status(
        &self,
        request: &Request,
    ) -> Result<(Response, CacheStatus), TransportError> {
        let key = request.cache_key();

        if !request.method().is_cacheable() {
            self.evict(key).await;
            let response = self.transport.round_trip(request).await?;
            self.store_or_evict(key, request, &response).await;
            return Ok((response, CacheStatus::Uncacheable));
        }

        // Partial content is neither served from nor written to storage.
        if request.headers().contains("range") {
            let response = self.transport.round_trip(request).await?;
            return Ok((response, CacheStatus::Uncacheable));
        }

        let mut status = CacheStatus::Miss;
        if let Some(cached) = self.lookup(key).await {
            if !vary_matches(cached.headers(), request.headers()) {
                status = CacheStatus::HitVaryMismatch;
            } else {
                match freshness::evaluate(cached.headers(), request.headers(), self.clock.now()) {
                    Freshness::Fresh => {
                        return Ok((self.serve(request, cached), CacheStatus::HitFresh));
                    }
                    Freshness::Stale => {
                        let response = self.revalidate(key, request, cached).await?;
                        return Ok((response, CacheStatus::HitStaleRevalidate));
                    }
                    Freshness::Transparent => status = CacheStatus::Uncacheable,
                }
            }
        }

        if status != CacheStatus::Uncacheable
            && CacheControl::from_headers(request.headers()).contains(ONLY_IF_CACHED)
        {
            return Ok((Response::new(StatusCode::GATEWAY_TIMEOUT), status));
        }

        let response = self.transport.round_trip(request).await?;
        self.store_or_evict(key, request, &response).await;
        Ok((response, status))
    }

    /// Reads and parses the entry for `key`. Unreadable entries are misses.
    async fn lookup(&self, key: &str) -> Option<Response> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match Response::parse(&bytes) {
                Ok(response) => Some(response),
                Err(e) => {
                    warn!(key, error = %e, "ignoring unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Prepares a stored response for the caller.
    fn serve(&self, request: &Request, mut cached: Response) -> Response {
        if self.mark_cached_responses {
            cached.headers_mut().set(X_FROM_CACHE, "1");
        }
        if *request.method() == Method::Head {
            cached.clear_body();
        }
        cached
    }

    /// Sends a conditional version of `request` for a stale entry.
    async fn revalidate(
        &self,
        key: &str,
        request: &Request,
        mut cached: Response,
    ) -> Result<Response, TransportError> {
        let mut conditional = request.clone();
        add_validators(conditional.headers_mut(), cached.headers());

        let response = match self.transport.round_trip(&conditional).await {
            Ok(response) => response,
            Err(e) => {
                self.evict(key).await;
                return Err(e);
            }
        };

        if response.status() == StatusCode::NOT_MODIFIED && *request.method() == Method::Get {
            splice_not_modified(&mut cached, &response);
            self.store_or_evict(key, request, &cached).await;
            return Ok(self.serve(request, cached));
        }

        if response.status() != StatusCode::OK {
            debug!(key, status = response.status().as_u16(), "revalidation failed; dropping entry");
            self.evict(key).await;
            return Ok(response);
        }

        self.store_or_evict(key, request, &response).await;
        Ok(response)
    }

    /// Writes `response` under `key` when both sides allow it, otherwise
    /// drops whatever is stored there.
    async fn store_or_evict(&self, key: &str, request: &Request, response: &Response) {
        let no_store = CacheControl::from_headers(request.headers()).contains(NO_STORE)
            || CacheControl::from_headers(response.headers()).contains(NO_STORE);
        if no_store {
            self.evict(key).await;
            return;
        }
        // HEAD shares its key with GET; a body-less copy must not replace it.
        if *request.method() == Method::Head {
            return;
        }

        let mut stored = response.clone();
        stored.headers_mut().remove(X_FROM_CACHE);
        record_varied(stored.headers_mut(), request.headers());

        if let Err(e) = self.cache.set(key, stored.to_bytes().freeze()).await {
            warn!(key, error = %e, "failed to store response");
        }
    }

    async fn evict(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            warn!(key, error = %e, "failed to delete cache entry");
        }
    }
}

impl<T: Transport, C: Cache> Transport for CachingTransport<T, C> {
    fn round_trip<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(async move {
            let (response, status) = self.round_trip_with_status(request).await?;
            debug!(
                key = request.cache_key(),
                method = %request.method(),
                status = response.status().as_u16(),
                cache = ?status,
                "request handled"
            );
            Ok(response)
        })
    }
}

/// Adds `If-None-Match` / `If-Modified-Since` from the stored response's
/// validators unless the caller already set them.
fn add_validators(request: &mut Headers, cached: &Headers) {
    if let Some(etag) = cached.get("etag") {
        if !request.contains("if-none-match") {
            request.set("If-None-Match", etag);
        }
    }
    if let Some(last_modified) = cached.get("last-modified") {
        if !request.contains("if-modified-since") {
            request.set("If-Modified-Since", last_modified);
        }
    }
}

/// Names treated as hop-by-hop for `response`: the fixed set plus every
/// header its `Connection` lists.
fn hop_by_hop_headers(response: &Headers) -> Vec<String> {
    let mut names: Vec<String> = HOP_BY_HOP.iter().map(|name| (*name).to_owned()).collect();
    names.extend(
        response
            .get_all("connection")
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(canonical_name),
    );
    names
}

/// Turns a stored response into the answer to a successful revalidation.
///
/// Hop-by-hop headers are never trusted from storage: they take the 304's
/// values, or are dropped when the 304 has none. Freshness headers present
/// on the 304 replace the stored ones.
fn splice_not_modified(cached: &mut Response, not_modified: &Response) {
    let fresh = not_modified.headers();
    let headers = cached.headers_mut();

    for name in hop_by_hop_headers(fresh) {
        match fresh.get_joined(&name) {
            Some(value) => headers.set(&name, value),
            None => {
                headers.remove(&name);
            }
        }
    }
    for name in REFRESHED_ON_304 {
        if let Some(value) = fresh.get_joined(name) {
            headers.set(name, value);
        }
    }

    cached.set_status(StatusCode::OK);
}
