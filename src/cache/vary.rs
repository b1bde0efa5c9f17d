//! `Vary` handling.
//!
//! When a response is stored, the request's value of every header the
//! response varies on is copied into a shadow header `X-Varied-<Name>` on the
//! stored copy. A later request may reuse the entry only if its values match
//! those shadows.

use crate::http::Headers;
use crate::http::headers::canonical_name;

/// Prefix of the shadow headers recorded on stored responses.
pub const VARIED_PREFIX: &str = "X-Varied-";

/// Returns the canonical header names listed in `headers`' `Vary`.
pub fn varied_names(headers: &Headers) -> Vec<String> {
    headers
        .get_all("vary")
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(canonical_name)
        .collect()
}

/// Returns `true` if `cached` (a stored response) may answer `request`.
///
/// Every varied name whose shadow was recorded must match the request's
/// current value, an absent header counting as empty. A name with no
/// recorded shadow was not sent by the storing request and does not
/// constrain later ones. `Vary: *` never matches.
pub fn vary_matches(cached: &Headers, request: &Headers) -> bool {
    varied_names(cached).iter().all(|name| {
        if name == "*" {
            return false;
        }
        match cached.get(&format!("{VARIED_PREFIX}{name}")) {
            Some(recorded) => request.get(name).unwrap_or("") == recorded,
            None => true,
        }
    })
}

/// Records the request's value of each varied header onto `response` as
/// `X-Varied-<Name>`. Headers the request did not send are not recorded.
pub fn record_varied(response: &mut Headers, request: &Headers) {
    for name in varied_names(response) {
        if name == "*" {
            continue;
        }
        match request.get(&name) {
            Some(value) if !value.is_empty() => {
                response.set(format!("{VARIED_PREFIX}{name}"), value);
            }
            _ => {}
        }
    }
}
