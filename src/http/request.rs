//! Request descriptors and HTTP/1.1 wire parsing via [`httparse`].

use bytes::Bytes;
use thiserror::Error;
use url::Url;

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request off the wire.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete — more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid Content-Length {value:?}")]
    InvalidContentLength { value: String },

    #[error("invalid request target {target:?}: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: url::ParseError,
    },
}

/// An outgoing request as seen by the dispatcher: method, absolute URL,
/// headers and body.
///
/// # Examples
///
/// ```
/// use swcache::http::{Method, Request};
///
/// let request = Request::get("https://example.com/static/app.js?v=3").unwrap();
/// assert_eq!(request.method(), &Method::Get);
/// assert_eq!(request.path(), "/static/app.js");
/// assert_eq!(request.url().query(), Some("v=3"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers accepted per request on the wire.
    const MAX_HEADERS: usize = 64;

    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Builds a `GET` request for an absolute URL.
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Method::Get, Url::parse(url)?))
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Parses the head of an HTTP/1.1 request from `buf`.
    ///
    /// Returns the request (with an empty body) and the offset at which the
    /// body begins. Absolute-form targets (`GET http://host/path`) are used
    /// as-is; origin-form targets (`GET /path`) take scheme, host and port from
    /// `origin`. The client's `Host` header never picks the upstream.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`] — the header block has not fully arrived.
    /// - [`RequestError::Parse`] — the data is malformed.
    /// - [`RequestError::MissingField`] — method or path is absent.
    /// - [`RequestError::InvalidTarget`] — the target does not form a valid URL.
    /// - [`RequestError::InvalidContentLength`] — `Content-Length` is not a number.
    pub fn parse(buf: &[u8], origin: &Url) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw = httparse::Request::new(&mut headers);

        let body_offset = match raw.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method = raw.method.ok_or(RequestError::MissingField { field: "method" })?;
        let Ok(method) = method.parse::<Method>();
        let target = raw.path.ok_or(RequestError::MissingField { field: "path" })?;

        let mut header_map = Headers::with_capacity(raw.headers.len());
        for header in raw.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        if let Some(value) = header_map.get("content-length") {
            if value.trim().parse::<usize>().is_err() {
                return Err(RequestError::InvalidContentLength {
                    value: value.to_owned(),
                });
            }
        }

        let url = if target.starts_with('/') {
            let mut url = origin.clone();
            let (path, query) = match target.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (target, None),
            };
            url.set_path(path);
            url.set_query(query);
            url.set_fragment(None);
            url
        } else {
            Url::parse(target).map_err(|source| RequestError::InvalidTarget {
                target: target.to_owned(),
                source,
            })?
        };

        Ok((
            Self {
                method,
                url,
                headers: header_map,
                body: Bytes::new(),
            },
            body_offset,
        ))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the absolute request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the URL path (without query or fragment).
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns `true` if the client connection should stay open afterwards.
    ///
    /// Wire requests default to keep-alive unless `Connection: close` is sent.
    pub fn is_keep_alive(&self) -> bool {
        !self
            .headers
            .get("connection")
            .is_some_and(|conn| conn.eq_ignore_ascii_case("close"))
    }

    /// Returns the value of the `Content-Length` header, if present and valid.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.trim().parse().ok()
    }
}
