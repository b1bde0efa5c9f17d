//! HTTP/1.1 responses: building, serializing, and parsing.
//!
//! A cached entry is a response in HTTP/1.1 wire format, so the same
//! [`Response::to_bytes`] / [`Response::parse`] pair serves both the storage
//! layer and the network transport.

use std::str;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use tracing::trace;

use super::{Headers, StatusCode};

/// Errors that can occur while parsing an HTTP/1.1 response.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response is incomplete — more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid status code: {0}")]
    InvalidStatus(u16),

    #[error("malformed chunked body")]
    InvalidChunk,
}

/// The status line and headers of a response, plus where its body starts.
#[derive(Debug)]
pub struct Head {
    pub status: StatusCode,
    pub headers: Headers,
    pub body_offset: usize,
}

/// An HTTP/1.1 response.
///
/// # Examples
///
/// ```
/// use rttp_cache::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::OK)
///     .header("Cache-Control", "max-age=60")
///     .body("hello");
///
/// let bytes = response.to_bytes();
/// let parsed = Response::parse(&bytes).unwrap();
/// assert_eq!(parsed.status(), StatusCode::OK);
/// assert_eq!(parsed.headers().get("cache-control"), Some("max-age=60"));
/// assert_eq!(parsed.body_bytes().as_ref(), b"hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Maximum number of headers we accept per response.
    const MAX_HEADERS: usize = 96;

    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the response body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Overwrites the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the response headers for in-place modification.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns the response body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Drops the body, keeping status and headers. Used to answer `HEAD`.
    pub fn clear_body(&mut self) {
        self.body = Bytes::new();
    }

    /// Serializes the response into HTTP/1.1 wire format.
    ///
    /// The body is always written with an exact `Content-Length`; any
    /// `Content-Length` or `Transfer-Encoding` header carried over from the
    /// network is replaced, since the body held here is already de-chunked.
    pub fn to_bytes(&self) -> BytesMut {
        let estimated_size = 128 + self.headers.len() * 64 + self.body.len();
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        for (name, value) in self.headers.iter() {
            if name.eq_ignore_ascii_case("content-length")
                || name.eq_ignore_ascii_case("transfer-encoding")
            {
                continue;
            }
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        buf.put(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        buf.put(&b"\r\n"[..]);
        buf.put(self.body.as_ref());

        buf
    }

    /// Parses the status line and headers at the front of `buf`.
    ///
    /// # Errors
    ///
    /// - [`ResponseError::Incomplete`] — the header block is not terminated yet.
    /// - [`ResponseError::Parse`] — the data is not an HTTP/1.x response.
    /// - [`ResponseError::InvalidStatus`] — the status code is out of range.
    pub fn parse_head(buf: &[u8]) -> Result<Head, ResponseError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw = httparse::Response::new(&mut headers);

        let body_offset = match raw.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(ResponseError::Incomplete),
        };

        let code = raw
            .code
            .ok_or(ResponseError::MissingField { field: "status" })?;
        let status = StatusCode::from_u16(code).ok_or(ResponseError::InvalidStatus(code))?;

        let mut header_map = Headers::with_capacity(raw.headers.len());
        for header in raw.headers.iter() {
            match str::from_utf8(header.value) {
                Ok(value) => header_map.insert(header.name, value),
                Err(_) => {
                    trace!(name = header.name, "header value is not UTF-8; keeping a lossy copy");
                    header_map.insert(header.name, String::from_utf8_lossy(header.value));
                }
            }
        }

        Ok(Head {
            status,
            headers: header_map,
            body_offset,
        })
    }

    /// Parses a complete response from `buf`.
    ///
    /// The body is delimited by `Content-Length` when present, decoded when
    /// `Transfer-Encoding: chunked`, and otherwise runs to the end of `buf`.
    ///
    /// # Errors
    ///
    /// Everything [`parse_head`](Self::parse_head) reports, plus
    /// [`ResponseError::Incomplete`] when fewer body bytes than declared are
    /// present and [`ResponseError::InvalidChunk`] for a broken chunked body.
    pub fn parse(buf: &[u8]) -> Result<Self, ResponseError> {
        let Head {
            status,
            headers,
            body_offset,
        } = Self::parse_head(buf)?;
        let rest = &buf[body_offset..];

        let chunked = headers
            .get("transfer-encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));

        let body = if chunked {
            decode_chunked(rest)?
        } else if let Some(len) = headers
            .get("content-length")
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            if rest.len() < len {
                return Err(ResponseError::Incomplete);
            }
            Bytes::copy_from_slice(&rest[..len])
        } else {
            Bytes::copy_from_slice(rest)
        };

        Ok(Self {
            status,
            headers,
            body,
        })
    }
}

impl From<Head> for Response {
    /// A body-less response from a parsed head, for `HEAD` requests and
    /// statuses that never carry a body.
    fn from(head: Head) -> Self {
        Self {
            status: head.status,
            headers: head.headers,
            body: Bytes::new(),
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

/// Decodes a `Transfer-Encoding: chunked` body. Trailers are discarded.
fn decode_chunked(mut buf: &[u8]) -> Result<Bytes, ResponseError> {
    let mut body = BytesMut::new();
    loop {
        let (offset, size) = match httparse::parse_chunk_size(buf) {
            Ok(httparse::Status::Complete(pair)) => pair,
            Ok(httparse::Status::Partial) => return Err(ResponseError::Incomplete),
            Err(_) => return Err(ResponseError::InvalidChunk),
        };
        let size = usize::try_from(size).map_err(|_| ResponseError::InvalidChunk)?;
        buf = &buf[offset..];

        if size == 0 {
            return Ok(body.freeze());
        }
        if buf.len() < size + 2 {
            return Err(ResponseError::Incomplete);
        }
        if &buf[size..size + 2] != b"\r\n" {
            return Err(ResponseError::InvalidChunk);
        }
        body.put(&buf[..size]);
        buf = &buf[size + 2..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn serialized_status_line_and_length() {
        let r = Response::new(StatusCode::OK).body("Hello");
        let s = to_string(r.to_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn stale_framing_headers_are_rewritten() {
        let r = Response::new(StatusCode::OK)
            .header("Transfer-Encoding", "chunked")
            .header("Content-Length", "999")
            .body("ok");
        let s = to_string(r.to_bytes());
        assert!(!s.contains("Transfer-Encoding"));
        assert!(!s.contains("999"));
        assert!(s.contains("Content-Length: 2\r\n"));
    }

    #[test]
    fn parse_respects_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabcdef";
        let r = Response::parse(raw).unwrap();
        assert_eq!(r.body_bytes().as_ref(), b"abc");
    }

    #[test]
    fn parse_short_body_is_incomplete() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc";
        assert!(matches!(Response::parse(raw), Err(ResponseError::Incomplete)));
    }

    #[test]
    fn parse_chunked_body() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
        let r = Response::parse(raw).unwrap();
        assert_eq!(r.body_bytes().as_ref(), b"Wikipedia");
    }

    #[test]
    fn parse_unregistered_status() {
        let raw = b"HTTP/1.1 299 Whatever\r\n\r\n";
        let r = Response::parse(raw).unwrap();
        assert_eq!(r.status().as_u16(), 299);
        assert!(r.body_bytes().is_empty());
    }

    #[test]
    fn non_utf8_header_value_is_kept() {
        let raw = b"HTTP/1.1 200 OK\r\nETag: \"caf\xe9\"\r\nContent-Length: 0\r\n\r\n";
        let r = Response::parse(raw).unwrap();
        assert_eq!(r.headers().get("etag"), Some("\"caf\u{FFFD}\""));

        let again = Response::parse(&r.to_bytes()).unwrap();
        assert_eq!(again.headers().get("etag"), r.headers().get("etag"));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(Response::parse(b"\x00\x01not http at all\r\n\r\n").is_err());
    }
}
