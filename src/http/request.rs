//! Outgoing HTTP/1.1 requests.
//!
//! A [`Request`] always targets an absolute URL: the serialized URL is the
//! cache key, and the network transport derives the `Host` header and the
//! origin-form request target from it.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use url::Url;

use super::{Headers, Method};

/// Errors that can occur while building a request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// An HTTP request headed for an origin server, possibly via the cache.
///
/// # Examples
///
/// ```
/// use rttp_cache::http::{Method, Request};
///
/// let request = Request::get("http://example.com/feed?page=2#top")
///     .unwrap()
///     .header("Accept", "application/json");
///
/// assert_eq!(request.method(), &Method::Get);
/// assert_eq!(request.cache_key(), "http://example.com/feed?page=2");
/// assert_eq!(request.headers().get("accept"), Some("application/json"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Creates a request for `url` with no headers and an empty body.
    ///
    /// Any fragment is dropped: it is never sent on the wire and must not
    /// split one resource across several cache keys.
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self {
            method,
            url,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Parses `url` and creates a `GET` request for it.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidUrl`] if `url` is not an absolute URL.
    pub fn get(url: &str) -> Result<Self, RequestError> {
        Self::parse(Method::Get, url)
    }

    /// Parses `url` and creates a request with the given method.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidUrl`] if `url` is not an absolute URL.
    pub fn parse(method: Method, url: &str) -> Result<Self, RequestError> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the canonical absolute URL string under which responses to
    /// this request are cached.
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request headers for in-place modification.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns the request body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns the origin-form request target: path plus query string.
    pub fn target(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_owned(),
        }
    }

    /// Serializes the request in HTTP/1.1 wire format.
    ///
    /// Writes `Host` from the URL unless the caller set one, forces
    /// `Connection: close` (one exchange per connection), and writes
    /// `Content-Length` whenever a body is present.
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(128 + self.headers.len() * 64 + self.body.len());

        buf.put(format!("{} {} HTTP/1.1\r\n", self.method, self.target()).as_bytes());

        if !self.headers.contains("host") {
            if let Some(host) = self.url.host_str() {
                let host = match self.url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_owned(),
                };
                buf.put(format!("Host: {host}\r\n").as_bytes());
            }
        }

        for (name, value) in self.headers.iter() {
            if name.eq_ignore_ascii_case("connection") || name.eq_ignore_ascii_case("content-length")
            {
                continue;
            }
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        buf.put(&b"Connection: close\r\n"[..]);
        if !self.body.is_empty() {
            buf.put(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }
        buf.put(&b"\r\n"[..]);
        buf.put(self.body.as_ref());

        buf
    }
}
