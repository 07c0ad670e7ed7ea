//! Response handler chain

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::link::Link;
use crate::transport::Response;

/// One node of a response handler chain
#[async_trait]
pub trait ResponseHandler: Send + Sync + Debug {
    /// Process `response` and continue with `next`
    async fn handle(
        &self,
        link: &Link,
        response: Response,
        next: ResponseNext<'_>,
    ) -> Result<Response>;
}

/// Remaining handlers of a chain
#[derive(Debug, Clone, Copy)]
pub struct ResponseNext<'a> {
    handlers: &'a [Arc<dyn ResponseHandler>],
    outer: Option<&'a ResponseNext<'a>>,
}

impl<'a> ResponseNext<'a> {
    /// Continuation running `handlers` and then stopping
    pub fn new(handlers: &'a [Arc<dyn ResponseHandler>]) -> Self {
        Self {
            handlers,
            outer: None,
        }
    }

    /// Continuation that returns the response unchanged
    pub fn end() -> ResponseNext<'static> {
        ResponseNext {
            handlers: &[],
            outer: None,
        }
    }

    /// Run the rest of the chain
    pub async fn run(self, link: &Link, response: Response) -> Result<Response> {
        let mut current = self;
        loop {
            if let Some((handler, handlers)) = current.handlers.split_first() {
                let next = ResponseNext {
                    handlers,
                    outer: current.outer,
                };
                return handler.handle(link, response, next).await;
            }
            match current.outer {
                Some(outer) => current = *outer,
                None => return Ok(response),
            }
        }
    }
}

/// Ordered list of response handlers, first element outermost
#[derive(Debug, Clone, Default)]
pub struct ResponseChain {
    handlers: Vec<Arc<dyn ResponseHandler>>,
}

impl ResponseChain {
    /// Empty chain, passes every response through
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with a single handler
    pub fn single<H>(handler: H) -> Self
    where
        H: ResponseHandler + 'static,
    {
        Self::new().with(handler)
    }

    /// Append `handler`
    pub fn with<H>(mut self, handler: H) -> Self
    where
        H: ResponseHandler + 'static,
    {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append an already shared handler
    pub fn with_shared(mut self, handler: Arc<dyn ResponseHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Handlers in execution order
    pub fn handlers(&self) -> &[Arc<dyn ResponseHandler>] {
        &self.handlers
    }

    /// Number of handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the chain has no handlers
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the chain on `response` without continuation
    pub async fn apply(&self, link: &Link, response: Response) -> Result<Response> {
        ResponseNext::new(&self.handlers).run(link, response).await
    }
}

#[async_trait]
impl ResponseHandler for ResponseChain {
    async fn handle(
        &self,
        link: &Link,
        response: Response,
        next: ResponseNext<'_>,
    ) -> Result<Response> {
        ResponseNext {
            handlers: &self.handlers,
            outer: Some(&next),
        }
        .run(link, response)
        .await
    }
}

impl From<Vec<Arc<dyn ResponseHandler>>> for ResponseChain {
    fn from(handlers: Vec<Arc<dyn ResponseHandler>>) -> Self {
        Self { handlers }
    }
}

impl FromIterator<Arc<dyn ResponseHandler>> for ResponseChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ResponseHandler>>>(iter: I) -> Self {
        Self {
            handlers: iter.into_iter().collect(),
        }
    }
}

/// Runs a side effect on the response, then continues
pub struct ActionHandler<F> {
    action: F,
}

impl<F> ActionHandler<F>
where
    F: Fn(&Response) + Send + Sync,
{
    /// Wrap `action`
    pub fn new(action: F) -> Self {
        Self { action }
    }
}

impl<F> Debug for ActionHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> ResponseHandler for ActionHandler<F>
where
    F: Fn(&Response) + Send + Sync,
{
    async fn handle(
        &self,
        link: &Link,
        response: Response,
        next: ResponseNext<'_>,
    ) -> Result<Response> {
        (self.action)(&response);
        next.run(link, response).await
    }
}

/// Transforms the response with a closure that may fail
pub struct InlineHandler<F> {
    f: F,
}

impl<F> InlineHandler<F>
where
    F: Fn(&Link, Response) -> Result<Response> + Send + Sync,
{
    /// Wrap `f`
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Debug for InlineHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> ResponseHandler for InlineHandler<F>
where
    F: Fn(&Link, Response) -> Result<Response> + Send + Sync,
{
    async fn handle(
        &self,
        link: &Link,
        response: Response,
        next: ResponseNext<'_>,
    ) -> Result<Response> {
        let response = (self.f)(link, response)?;
        next.run(link, response).await
    }
}

/// Awaits a closure over the owned response, then continues
pub struct AsyncHandler<F> {
    f: F,
}

impl<F, Fut> AsyncHandler<F>
where
    F: Fn(Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    /// Wrap `f`
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Debug for AsyncHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> ResponseHandler for AsyncHandler<F>
where
    F: Fn(Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    async fn handle(
        &self,
        link: &Link,
        response: Response,
        next: ResponseNext<'_>,
    ) -> Result<Response> {
        let response = (self.f)(response).await?;
        next.run(link, response).await
    }
}

/// Fails every response outside `2xx`
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCheck;

#[async_trait]
impl ResponseHandler for StatusCheck {
    async fn handle(
        &self,
        link: &Link,
        response: Response,
        next: ResponseNext<'_>,
    ) -> Result<Response> {
        if !response.is_success() {
            tracing::warn!(
                kind = %link.kind(),
                status = response.status(),
                reason = response.reason(),
                "Unexpected response status"
            );
            return Err(Error::UnexpectedStatus {
                code: response.status(),
                reason: response.reason().to_string(),
            });
        }
        next.run(link, response).await
    }
}
