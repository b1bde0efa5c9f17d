//! HTTP/1.1 over a plain Tokio TCP connection.
//!
//! One connection per exchange: the request is sent with
//! `Connection: close` and the response is read until it is complete or the
//! server closes the socket.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::{Transport, TransportError};
use crate::BoxFuture;
use crate::http::{Method, Request, Response, StatusCode, response::ResponseError};

/// Maximum size of a complete HTTP response we will buffer (8 MiB).
const MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// Sends requests to `http://` origins over TCP.
///
/// TLS is out of reach for this transport; `https://` URLs fail with
/// [`TransportError::UnsupportedScheme`].
#[derive(Debug, Clone)]
pub struct TcpTransport {
    max_response_size: usize,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }

    /// Caps how many bytes a single response may occupy.
    #[must_use]
    pub fn max_response_size(mut self, max_bytes: usize) -> Self {
        self.max_response_size = max_bytes;
        self
    }

    async fn exchange(&self, request: &Request) -> Result<Response, TransportError> {
        let url = request.url();
        if url.scheme() != "http" {
            return Err(TransportError::UnsupportedScheme(url.scheme().to_owned()));
        }
        let host = url.host_str().ok_or(TransportError::MissingHost)?;
        let port = url.port_or_known_default().unwrap_or(80);

        let mut stream = TcpStream::connect((host, port)).await?;
        debug!(host, port, method = %request.method(), target = %request.target(), "sending request");

        stream.write_all(&request.to_bytes()).await?;
        stream.flush().await?;

        let head_only = *request.method() == Method::Head;
        let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

        loop {
            let bytes_read = stream.read_buf(&mut buf).await?;
            let eof = bytes_read == 0;

            if buf.len() > self.max_response_size {
                return Err(TransportError::ResponseTooLarge {
                    max_bytes: self.max_response_size,
                });
            }

            skip_interim(&mut buf);
            if let Some(response) = try_complete(&buf, head_only, eof)? {
                debug!(status = response.status().as_u16(), bytes = buf.len(), "response received");
                return Ok(response);
            }
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    fn round_trip<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(self.exchange(request))
    }
}

/// Returns the response once `buf` holds all of it.
///
/// Before EOF, a body without `Content-Length` or chunked framing is never
/// complete; at EOF it runs to the end of the buffer.
fn try_complete(buf: &[u8], head_only: bool, eof: bool) -> Result<Option<Response>, ResponseError> {
    let head = match Response::parse_head(buf) {
        Ok(head) => head,
        Err(ResponseError::Incomplete) if !eof => return Ok(None),
        Err(e) => return Err(e),
    };

    if head_only || !carries_body(head.status) {
        return Ok(Some(Response::from(head)));
    }

    let framed = head.headers.contains("content-length")
        || head
            .headers
            .get("transfer-encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
    if !framed && !eof {
        return Ok(None);
    }

    match Response::parse(buf) {
        Ok(response) => Ok(Some(response)),
        Err(ResponseError::Incomplete) if !eof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Drops any complete interim (1xx) responses at the front of `buf`.
/// `101 Switching Protocols` is final and stays.
fn skip_interim(buf: &mut BytesMut) {
    while let Ok(head) = Response::parse_head(buf) {
        let code = head.status.as_u16();
        if !(100..200).contains(&code) || code == 101 {
            return;
        }
        debug!(status = code, "skipping interim response");
        buf.advance(head.body_offset);
    }
}

fn carries_body(status: StatusCode) -> bool {
    let code = status.as_u16();
    !(code < 200 || code == 204 || code == 304)
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    /// Serves exactly one connection with a canned reply and hands back
    /// what the client sent.
    async fn serve_once(reply: &'static [u8]) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = BytesMut::with_capacity(1024);
            while !buf.ends_with(b"\r\n\r\n") {
                if stream.read_buf(&mut buf).await.unwrap() == 0 {
                    break;
                }
            }
            stream.write_all(reply).await.unwrap();
            stream.shutdown().await.ok();
            String::from_utf8(buf.to_vec()).unwrap()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn content_length_response() {
        let (base, server) =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nETag: \"v1\"\r\n\r\nhello").await;
        let request = Request::get(&format!("{base}/greeting?lang=en")).unwrap();

        let response = TcpTransport::new().round_trip(&request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("etag"), Some("\"v1\""));
        assert_eq!(response.body_bytes().as_ref(), b"hello");

        let sent = server.await.unwrap();
        assert!(sent.starts_with("GET /greeting?lang=en HTTP/1.1\r\n"));
        assert!(sent.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn unframed_body_runs_to_eof() {
        let (base, _server) = serve_once(b"HTTP/1.1 200 OK\r\n\r\nuntil close").await;
        let request = Request::get(&base).unwrap();
        let response = TcpTransport::new().round_trip(&request).await.unwrap();
        assert_eq!(response.body_bytes().as_ref(), b"until close");
    }

    #[tokio::test]
    async fn not_modified_has_no_body() {
        let (base, _server) =
            serve_once(b"HTTP/1.1 304 Not Modified\r\nContent-Length: 1234\r\n\r\n").await;
        let request = Request::get(&base).unwrap();
        let response = TcpTransport::new().round_trip(&request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(response.body_bytes().is_empty());
    }

    #[tokio::test]
    async fn https_is_rejected() {
        let request = Request::get("https://example.com/").unwrap();
        let err = TcpTransport::new().round_trip(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedScheme(s) if s == "https"));
    }

    #[tokio::test]
    async fn oversized_response_is_rejected() {
        let (base, _server) =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n0123456789").await;
        let request = Request::get(&base).unwrap();
        let err = TcpTransport::new()
            .max_response_size(16)
            .round_trip(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ResponseTooLarge { max_bytes: 16 }));
    }

    #[tokio::test]
    async fn interim_responses_are_skipped() {
        let (base, _server) = serve_once(
            b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 103 Early Hints\r\nLink: </a.css>\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok",
        )
        .await;
        let request = Request::get(&base).unwrap();
        let response = TcpTransport::new().round_trip(&request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains("link"));
        assert_eq!(response.body_bytes().as_ref(), b"ok");
    }

    #[test]
    fn interim_head_alone_waits_for_final_response() {
        let mut buf = BytesMut::from(&b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 2"[..]);
        skip_interim(&mut buf);
        assert_eq!(&buf[..], b"HTTP/1.1 2");
        assert!(try_complete(&buf, false, false).unwrap().is_none());

        let mut switching = BytesMut::from(&b"HTTP/1.1 101 Switching Protocols\r\n\r\n"[..]);
        skip_interim(&mut switching);
        assert_eq!(
            try_complete(&switching, false, false).unwrap().map(|r| r.status().as_u16()),
            Some(101)
        );
    }

    #[test]
    fn partial_head_waits_for_more() {
        assert!(try_complete(b"HTTP/1.1 200 OK\r\nContent-", false, false)
            .unwrap()
            .is_none());
        assert!(try_complete(b"HTTP/1.1 200 OK\r\nContent-", false, true).is_err());
    }
}
