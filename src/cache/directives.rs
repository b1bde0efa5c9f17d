//! `Cache-Control` directive parsing.

use std::collections::HashMap;

use crate::http::Headers;

pub const NO_CACHE: &str = "no-cache";
pub const NO_STORE: &str = "no-store";
pub const ONLY_IF_CACHED: &str = "only-if-cached";
pub const MAX_AGE: &str = "max-age";
pub const MIN_FRESH: &str = "min-fresh";
pub const MAX_STALE: &str = "max-stale";

/// The directives of one `Cache-Control` header, keyed verbatim.
///
/// Boolean directives such as `no-cache` are present with an empty value;
/// use [`contains`](Self::contains) to tell them apart from absent ones.
/// Unknown directives are kept as-is, so lookups for names the cache does not
/// understand simply miss.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::CacheControl;
///
/// let cc = CacheControl::parse("no-cache, max-age=3600");
/// assert!(cc.contains("no-cache"));
/// assert_eq!(cc.get("no-cache"), Some(""));
/// assert_eq!(cc.get("max-age"), Some("3600"));
/// assert!(CacheControl::parse("").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: HashMap<String, String>,
}

impl CacheControl {
    /// Parses a single `Cache-Control` header value. Never fails.
    pub fn parse(value: &str) -> Self {
        let mut directives = HashMap::new();
        for part in value.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim().trim_matches(',').trim();
                    let value = value
                        .strip_prefix('"')
                        .and_then(|v| v.strip_suffix('"'))
                        .unwrap_or(value);
                    directives.insert(name.trim().to_owned(), value.to_owned());
                }
                None => {
                    directives.insert(part.to_owned(), String::new());
                }
            }
        }
        Self { directives }
    }

    /// Parses every `Cache-Control` line in `headers` as one directive list.
    pub fn from_headers(headers: &Headers) -> Self {
        headers
            .get_joined("cache-control")
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    /// Returns `true` if the directive is present, with or without a value.
    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// Returns the directive's value; boolean directives yield `""`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_header_yields_empty_map() {
        assert!(CacheControl::parse("").is_empty());
        assert!(CacheControl::parse(" , ,").is_empty());
        assert!(CacheControl::from_headers(&Headers::new()).is_empty());
    }

    #[test]
    fn boolean_and_valued_directives() {
        let cc = CacheControl::parse("no-cache, max-age=3600");
        assert_eq!(cc.len(), 2);
        assert_eq!(cc.get(NO_CACHE), Some(""));
        assert_eq!(cc.get(MAX_AGE), Some("3600"));
        assert!(!cc.contains("foo"));
    }

    #[test]
    fn spaces_and_quotes_are_trimmed() {
        let cc = CacheControl::parse("  max-age = 60 ,private, community=\"UCI\"");
        assert_eq!(cc.get(MAX_AGE), Some("60"));
        assert_eq!(cc.get("community"), Some("UCI"));
        assert!(cc.contains("private"));
    }

    #[test]
    fn names_are_case_sensitive() {
        let cc = CacheControl::parse("No-Store");
        assert!(!cc.contains(NO_STORE));
        assert!(cc.contains("No-Store"));
    }

    #[test]
    fn multiple_header_lines_merge() {
        let mut headers = Headers::new();
        headers.insert("Cache-Control", "no-store");
        headers.insert("Cache-Control", "min-fresh=5");
        let cc = CacheControl::from_headers(&headers);
        assert!(cc.contains(NO_STORE));
        assert_eq!(cc.get(MIN_FRESH), Some("5"));
    }
}
