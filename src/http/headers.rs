//! HTTP header map with case-insensitive name lookup.
//!
//! HTTP headers are order-preserving and case-insensitive per [RFC 9110 §5].
//! Names are canonicalized (`content-type` → `Content-Type`) on the way in so
//! that serialized cache entries and the synthetic `X-Varied-*` headers have
//! one stable spelling.

use std::fmt;

/// Canonicalizes a header name: the first letter and every letter following
/// a hyphen are upper-cased, the rest lower-cased.
///
/// Names containing bytes outside the token alphabet (spaces, colons, ...)
/// are returned unchanged.
///
/// ```
/// use rttp_cache::http::headers::canonical_name;
///
/// assert_eq!(canonical_name("accept-language"), "Accept-Language");
/// assert_eq!(canonical_name("ETAG"), "Etag");
/// ```
pub fn canonical_name(name: &str) -> String {
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
    {
        return name.to_owned();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// A case-insensitive, multi-value HTTP header map.
///
/// Preserves insertion order and allows multiple values per header name,
/// matching the semantics of HTTP/1.1 header fields (RFC 9110 §5.3).
///
/// # Examples
///
/// ```
/// use rttp_cache::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("cache-control", "max-age=60");
/// headers.insert("Vary", "Accept");
/// headers.set("vary", "Accept-Encoding");
///
/// assert_eq!(headers.get("Cache-Control"), Some("max-age=60"));
/// assert_eq!(headers.get("vary"), Some("Accept-Encoding"));
/// assert_eq!(headers.iter().next(), Some(("Cache-Control", "max-age=60")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map with pre-allocated capacity for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Appends a header entry. Multiple values for the same name are preserved.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.inner
            .push((canonical_name(name.as_ref()), value.into()));
    }

    /// Replaces every value of `name` with a single `value`.
    ///
    /// The new entry takes the position of the first removed one, or is
    /// appended when the header was absent.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        match self.inner.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(pos) => {
                self.inner[pos].1 = value.into();
                let mut index = 0;
                self.inner.retain(|(k, _)| {
                    let keep = index <= pos || !k.eq_ignore_ascii_case(name);
                    index += 1;
                    keep
                });
            }
            None => self.insert(name, value),
        }
    }

    /// Returns the first value for the given header name (case-insensitive), or `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over all values for the given header name (case-insensitive).
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value of `name` joined with `", "`, the way a
    /// comma-separated list header spread over several lines reads as one.
    pub fn get_joined(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self.get_all(name).collect();
        (!values.is_empty()).then(|| values.join(", "))
    }

    /// Removes all entries with the given header name (case-insensitive).
    ///
    /// Returns `true` if any entries were removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.inner.len();
        self.inner.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.inner.len() < before
    }

    /// Returns `true` if the map contains at least one entry with the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Returns the total number of header entries (not unique names).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no header entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.inner {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_get() {
        let mut h = Headers::new();
        h.insert("Content-Type", "text/plain");
        assert_eq!(h.get("content-type"), Some("text/plain"));
        assert_eq!(h.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn names_are_canonicalized_on_insert() {
        let mut h = Headers::new();
        h.insert("x-varied-accept-language", "en");
        assert_eq!(h.to_string(), "X-Varied-Accept-Language: en\r\n");
    }

    #[test]
    fn canonical_name_leaves_invalid_tokens_alone() {
        assert_eq!(canonical_name("bad name"), "bad name");
        assert_eq!(canonical_name("te"), "Te");
    }

    #[test]
    fn set_replaces_all_values_in_place() {
        let mut h = Headers::new();
        h.insert("Etag", "\"a\"");
        h.insert("Date", "x");
        h.insert("etag", "\"b\"");
        h.set("ETag", "\"c\"");
        let pairs: Vec<_> = h.iter().collect();
        assert_eq!(pairs, vec![("Etag", "\"c\""), ("Date", "x")]);
    }

    #[test]
    fn joined_list_values() {
        let mut h = Headers::new();
        h.insert("Cache-Control", "no-cache");
        h.insert("cache-control", "max-age=10");
        assert_eq!(
            h.get_joined("cache-control").as_deref(),
            Some("no-cache, max-age=10")
        );
        assert_eq!(h.get_joined("vary"), None);
    }

    #[test]
    fn remove() {
        let mut h = Headers::new();
        h.insert("X-Foo", "bar");
        h.insert("X-Foo", "baz");
        assert!(h.remove("x-foo"));
        assert!(h.is_empty());
        assert!(!h.remove("x-foo")); // already gone
    }
}
