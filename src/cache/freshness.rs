//! Freshness evaluation for cached responses.
//!
//! Only the private-cache subset of RFC 7234 is implemented: `public`,
//! `private` and `s-maxage` carry no meaning here, and a request's
//! `max-stale` is parsed but not honored, so a stale response is never
//! served without revalidation.

use chrono::{DateTime, TimeDelta, Utc};

use super::directives::{CacheControl, MAX_AGE, MIN_FRESH, NO_CACHE, ONLY_IF_CACHED};
use super::http_date::parse_http_date;
use crate::http::Headers;

/// How a cached response may be used for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve from cache without contacting the origin.
    Fresh,
    /// Usable only after the origin confirms it (conditional request).
    Stale,
    /// Must not be used at all; go to the network.
    Transparent,
}

/// Decides whether a cached response with `response` headers may answer a
/// request with `request` headers at time `now`.
///
/// The first matching rule wins:
///
/// 1. request `no-cache` → [`Freshness::Transparent`]
/// 2. response `no-cache` → [`Freshness::Stale`]
/// 3. request `only-if-cached` → [`Freshness::Fresh`]
/// 4. missing or unparsable `Date` → [`Freshness::Stale`]
/// 5. otherwise fresh iff the lifetime exceeds the current age
///
/// The lifetime is the response's `max-age`, else `Expires − Date`, else
/// zero; a request `max-age` replaces it. A request `min-fresh=N` adds `N`
/// seconds to the age before comparing.
pub fn evaluate(response: &Headers, request: &Headers, now: DateTime<Utc>) -> Freshness {
    let response_cc = CacheControl::from_headers(response);
    let request_cc = CacheControl::from_headers(request);

    if request_cc.contains(NO_CACHE) {
        return Freshness::Transparent;
    }
    if response_cc.contains(NO_CACHE) {
        return Freshness::Stale;
    }
    if request_cc.contains(ONLY_IF_CACHED) {
        return Freshness::Fresh;
    }

    let Some(date) = response.get("date").and_then(parse_http_date) else {
        return Freshness::Stale;
    };
    let mut current_age = (now - date).max(TimeDelta::zero());

    let mut lifetime = match response_cc.get(MAX_AGE) {
        Some(max_age) => seconds(max_age).unwrap_or_else(TimeDelta::zero),
        None => response
            .get("expires")
            .and_then(parse_http_date)
            .map(|expires| expires - date)
            .unwrap_or_else(TimeDelta::zero),
    };

    if let Some(max_age) = request_cc.get(MAX_AGE) {
        lifetime = seconds(max_age).unwrap_or_else(TimeDelta::zero);
    }

    if let Some(min_fresh) = request_cc.get(MIN_FRESH).and_then(seconds) {
        current_age += min_fresh;
    }

    if lifetime > current_age {
        Freshness::Fresh
    } else {
        Freshness::Stale
    }
}

/// Parses a delta-seconds directive value.
fn seconds(value: &str) -> Option<TimeDelta> {
    value.trim().parse::<i64>().ok().and_then(TimeDelta::try_seconds)
}
