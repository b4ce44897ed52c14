//! Response snapshots.
//!
//! A [`Response`] is immutable once built and cheap to clone: the body is a
//! reference-counted [`Bytes`], so the copy stored in a cache and the copy
//! returned to the caller share one allocation.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Headers, StatusCode};

/// Body of the placeholder returned when neither cache nor network can answer.
pub const OFFLINE_BODY: &str = "Offline";

/// Headers that describe a single connection rather than the resource, and are
/// therefore rewritten on every serialization instead of replayed.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
];

/// An HTTP response: status, headers and a complete body.
///
/// # Examples
///
/// ```
/// use swcache::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::OK)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let cached = response.clone();
/// assert_eq!(cached.text(), Some(r#"{"status":"ok"}"#));
///
/// let wire = response.to_wire(true);
/// let text = std::str::from_utf8(&wire).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// The fixed `503 Offline` placeholder.
    pub fn offline() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(OFFLINE_BODY)
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the whole header map.
    #[must_use]
    pub fn headers_from(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Shorthand for `status().is_success()`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as UTF-8 text, or `None` if it is not valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Serializes the response in HTTP/1.1 wire format.
    ///
    /// Connection-scoped headers stored with the snapshot are dropped and
    /// rewritten: `Content-Length` always reflects the body held here, and
    /// `Connection` reflects `keep_alive`.
    pub fn to_wire(&self, keep_alive: bool) -> BytesMut {
        let content_length = self.body.len();
        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason().unwrap_or("")
            )
            .as_bytes(),
        );

        for (name, value) in self.headers.iter() {
            if HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h)) {
                continue;
            }
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        if !self.body.is_empty() && !self.headers.contains("content-type") {
            buf.put(&b"Content-Type: application/octet-stream\r\n"[..]);
        }

        let connection = if keep_alive { "keep-alive" } else { "close" };
        buf.put(format!("Connection: {connection}\r\n").as_bytes());
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        buf.put(&b"\r\n"[..]);
        buf.put(self.body.as_ref());

        buf
    }
}
