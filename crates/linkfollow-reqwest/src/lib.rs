//! reqwest transport for linkfollow
//!
//! ```no_run
//! use linkfollow::{FollowLinkExt, Link};
//! use linkfollow_reqwest::ReqwestTransport;
//!
//! async fn example() -> linkfollow::Result<()> {
//!     let transport = ReqwestTransport::new();
//!     let response = transport
//!         .follow_link(&Link::new("https://example.org/about"))
//!         .await?;
//!     println!("{}", response.text()?);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use linkfollow::{Request, Response, Transport, TransportError};

/// Map a reqwest failure onto the transport error kinds
fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/// [`Transport`] backed by a [`reqwest::Client`]
///
/// Status codes are never interpreted here; every received response is
/// handed back for dispatch.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport over an existing client
    pub fn from_reqwest(client: reqwest::Client) -> Self {
        Self { inner: client }
    }

    /// Underlying client
    pub fn client(&self) -> &reqwest::Client {
        &self.inner
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let headers = request
            .wire_headers()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        let mut builder = self
            .inner
            .request(request.method, request.target.as_str())
            .headers(headers);
        if let Some(payload) = request.payload {
            let (content, _) = payload.into_parts();
            builder = builder.body(content);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        tracing::trace!(status = status.as_u16(), url = %response.url(), "reqwest response");

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;

        let mut converted = Response::new(status.as_u16())
            .with_headers(headers)
            .with_body(body.to_vec());
        if let Some(reason) = status.canonical_reason() {
            converted = converted.with_reason(reason);
        }
        Ok(converted)
    }
}
