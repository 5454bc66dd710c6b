//! Outgoing request description.
//!
//! A [`Request`] is immutable once built and only read by the transport, so the
//! same value can be replayed across connection attempts.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use thiserror::Error;
use url::Url;

/// Error building a [`Request`].
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request url must be absolute http(s): {url}")]
    InvalidUrl { url: String },
    #[error("failed to parse request url: {0}")]
    ParseUrl(#[from] url::ParseError),
    #[error("invalid header name {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
}

/// Request content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    bytes: Bytes,
    length_known: bool,
}

impl Content {
    /// Content sent with a `Content-Length` header.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            length_known: true,
        }
    }

    /// Content sent with chunked transfer encoding.
    pub fn chunked(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            length_known: false,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Declared length, `None` when the content is streamed without one.
    pub fn declared_length(&self) -> Option<u64> {
        self.length_known.then_some(self.bytes.len() as u64)
    }
}

/// A single logical request to one endpoint.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    content: Option<Content>,
}

impl Request {
    /// Create a request; the url must be absolute with an `http` or `https` scheme.
    pub fn new(method: Method, url: Url) -> Result<Self, RequestError> {
        if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
            return Err(RequestError::InvalidUrl {
                url: url.to_string(),
            });
        }
        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            content: None,
        })
    }

    /// Parse `url` and create a request.
    pub fn parse(method: Method, url: &str) -> Result<Self, RequestError> {
        Self::new(method, Url::parse(url)?)
    }

    pub fn get(url: &str) -> Result<Self, RequestError> {
        Self::parse(Method::GET, url)
    }

    pub fn head(url: &str) -> Result<Self, RequestError> {
        Self::parse(Method::HEAD, url)
    }

    pub fn post(url: &str) -> Result<Self, RequestError> {
        Self::parse(Method::POST, url)
    }

    pub fn put(url: &str) -> Result<Self, RequestError> {
        Self::parse(Method::PUT, url)
    }

    pub fn delete(url: &str) -> Result<Self, RequestError> {
        Self::parse(Method::DELETE, url)
    }

    /// Append a header, validating name and value.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, RequestError> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
                RequestError::InvalidHeaderName {
                    name: name.to_string(),
                    source,
                }
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|source| RequestError::InvalidHeaderValue {
                name: name.to_string(),
                source,
            })?;
        self.headers.append(header_name, header_value);
        Ok(self)
    }

    /// Replace the header set.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attach content with a known length.
    pub fn with_content(mut self, bytes: impl Into<Bytes>) -> Self {
        self.content = Some(Content::new(bytes));
        self
    }

    /// Attach content streamed without a declared length.
    pub fn with_chunked_content(mut self, bytes: impl Into<Bytes>) -> Self {
        self.content = Some(Content::chunked(bytes));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// `host:port` of the target, used as the logging target.
    pub fn authority(&self) -> String {
        match (self.url.host_str(), self.url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        }
    }

    /// True when the target host is a loopback address or `localhost`.
    pub fn is_loopback(&self) -> bool {
        match self.url.host() {
            Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
            Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
            Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            None => false,
        }
    }
}
