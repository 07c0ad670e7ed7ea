//! Exchange orchestration: link to request, request to response, response to
//! handlers

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::dispatch::DispatchTable;
use crate::error::{Error, Result};
use crate::link::Link;
use crate::transport::{Response, Transport};

/// Follow `link` over `transport`, dispatching through the global table
pub async fn follow<T>(link: &Link, transport: &T) -> Result<Response>
where
    T: Transport + ?Sized,
{
    follow_with(link, transport, DispatchTable::global()).await
}

/// Follow `link` over `transport`, dispatching through `table`
///
/// The request is sent exactly once. Transport failures are returned without
/// running any handler.
#[instrument(skip_all, fields(kind = %link.kind(), method = %link.method()))]
pub async fn follow_with<T>(link: &Link, transport: &T, table: &DispatchTable) -> Result<Response>
where
    T: Transport + ?Sized,
{
    let request = link.build_request()?;
    tracing::debug!(target_uri = %request.target, "Sending request");

    let response = transport.send(request).await?;
    tracing::debug!(status = response.status(), "Received response");

    table.dispatch(link, response).await
}

/// Like [`follow_with`], giving up with [`Error::Cancelled`] if `token` fires
/// before the response arrives
///
/// Once a response is in hand the handlers run to completion.
#[instrument(skip_all, fields(kind = %link.kind(), method = %link.method()))]
pub async fn follow_cancellable<T>(
    link: &Link,
    transport: &T,
    table: &DispatchTable,
    token: &CancellationToken,
) -> Result<Response>
where
    T: Transport + ?Sized,
{
    if token.is_cancelled() {
        tracing::debug!("Exchange cancelled before the request was sent");
        return Err(Error::Cancelled);
    }
    let request = link.build_request()?;

    let response = tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::debug!("Exchange cancelled before a response arrived");
            return Err(Error::Cancelled);
        }
        response = transport.send(request) => response?,
    };
    tracing::debug!(status = response.status(), "Received response");

    table.dispatch(link, response).await
}

/// Follow links directly on a transport
#[async_trait]
pub trait FollowLinkExt: Transport {
    /// See [`follow`]
    async fn follow_link(&self, link: &Link) -> Result<Response> {
        follow(link, self).await
    }

    /// See [`follow_with`]
    async fn follow_link_with(&self, link: &Link, table: &DispatchTable) -> Result<Response> {
        follow_with(link, self, table).await
    }

    /// See [`follow_cancellable`]
    async fn follow_link_cancellable(
        &self,
        link: &Link,
        table: &DispatchTable,
        token: &CancellationToken,
    ) -> Result<Response> {
        follow_cancellable(link, self, table, token).await
    }
}

impl<T> FollowLinkExt for T where T: Transport + ?Sized {}
