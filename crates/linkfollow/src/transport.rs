//! Transport boundary
//!
//! The crate never talks to the network itself. It hands a [`Request`] to a
//! [`Transport`] and consumes the [`Response`] the transport hands back.

use std::fmt::Debug;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};

use crate::error::{Error, Result, TransportError};

/// Request body with its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    content: Vec<u8>,
    media_type: String,
}

impl Payload {
    /// New payload from raw bytes
    pub fn new(content: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            media_type: media_type.into(),
        }
    }

    /// `text/plain` payload
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(content.into().into_bytes(), "text/plain; charset=utf-8")
    }

    /// `application/json` payload from an already serialized document
    pub fn json(content: impl Into<String>) -> Self {
        Self::new(content.into().into_bytes(), "application/json")
    }

    /// Body bytes
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Media type sent as `Content-Type`
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Split into bytes and media type
    pub fn into_parts(self) -> (Vec<u8>, String) {
        (self.content, self.media_type)
    }
}

/// Whether `method` may carry a request body
pub fn permits_body(method: &Method) -> bool {
    ![
        Method::GET,
        Method::HEAD,
        Method::OPTIONS,
        Method::TRACE,
        Method::CONNECT,
    ]
    .contains(method)
}

/// Outbound request, shaped by the request builder chain
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Target URI
    pub target: String,
    /// Headers accumulated by the chain
    pub headers: HeaderMap,
    /// Optional body
    pub payload: Option<Payload>,
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::request_build(format!("Invalid header name '{name}': {e}")))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::request_build(format!("Invalid value for header '{name}': {e}")))
}

impl Request {
    /// Minimal request with no headers and no body
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderMap::new(),
            payload: None,
        }
    }

    /// Replace every value of `name` with `value`
    pub fn insert_header(&mut self, name: &str, value: &str) -> Result<()> {
        let value = header_value(name, value)?;
        self.headers.insert(header_name(name)?, value);
        Ok(())
    }

    /// Add `value` to the values of `name`
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<()> {
        let value = header_value(name, value)?;
        self.headers.append(header_name(name)?, value);
        Ok(())
    }

    /// Builder form of [`Request::insert_header`]
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.insert_header(name, value)?;
        Ok(self)
    }

    /// Values of `name` joined with `", "`
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// Headers to put on the wire, including `Content-Type` from the payload
    /// unless a builder already set one
    pub fn wire_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.headers.clone();
        if let Some(payload) = &self.payload {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(
                    CONTENT_TYPE,
                    header_value(CONTENT_TYPE.as_str(), payload.media_type())?,
                );
            }
        }
        Ok(headers)
    }
}

/// Response received from a [`Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    reason: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    /// New response, the reason phrase defaults to the canonical one
    pub fn new(status: u16) -> Self {
        let reason = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            reason,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Override the reason phrase
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Replace the headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Check if the response status is a success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response status is a redirect (3xx)
    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Check if the response status is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response status is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Body bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the response body as text
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.clone())
            .map_err(|e| Error::handler(e.utf8_error()))
    }

    /// Take the body, consuming the response
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Capability that puts a [`Request`] on the wire
///
/// Implementations decide about connections, TLS and timeouts. They must not
/// interpret the status code; every received response is returned as `Ok`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Send `request` and wait for the complete response
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait::async_trait]
impl<T> Transport for std::sync::Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request).await
    }
}
