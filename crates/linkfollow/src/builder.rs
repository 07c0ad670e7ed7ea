//! Request builder chain
//!
//! A chain is an ordered list of [`RequestBuilder`] nodes. Each node receives
//! the request produced so far together with a [`Next`] handle to the rest of
//! the chain. A node either hands its result to `next` and returns whatever
//! comes back, or stops the chain by returning early (usually with an error).
//!
//! ```
//! use linkfollow::{AcceptHeader, InlineRequestBuilder, LinkFactory, LinkKind, RequestChain};
//!
//! let mut factory = LinkFactory::new();
//! factory.register(
//!     LinkKind::STYLESHEET,
//!     RequestChain::new()
//!         .with(AcceptHeader::new(["text/css"]))
//!         .with(InlineRequestBuilder::new(|request| {
//!             request.with_header("accept-encoding", "gzip")
//!         })),
//! );
//!
//! let request = factory
//!     .create_with_target(LinkKind::STYLESHEET, "http://example.org/site.css")
//!     .build_request()
//!     .expect("valid link");
//! assert_eq!(request.header("accept").as_deref(), Some("text/css"));
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::link::{Link, MergeMode};
use crate::query::merge_query;
use crate::template;
use crate::transport::Request;

/// One node of a request builder chain
pub trait RequestBuilder: Send + Sync + Debug {
    /// Transform `request` and continue with `next`
    fn build(&self, link: &Link, request: Request, next: Next<'_>) -> Result<Request>;
}

/// Remaining nodes of a chain
///
/// Nested chains keep a reference to the continuation of the chain that
/// contains them, so `[A, [B, C]]` runs exactly like `[A, B, C]`.
#[derive(Debug, Clone, Copy)]
pub struct Next<'a> {
    nodes: &'a [Arc<dyn RequestBuilder>],
    outer: Option<&'a Next<'a>>,
}

impl<'a> Next<'a> {
    /// Continuation running `nodes` and then stopping
    pub fn new(nodes: &'a [Arc<dyn RequestBuilder>]) -> Self {
        Self { nodes, outer: None }
    }

    /// Continuation that returns the request unchanged
    pub fn end() -> Next<'static> {
        Next {
            nodes: &[],
            outer: None,
        }
    }

    /// Run the rest of the chain
    pub fn run(self, link: &Link, request: Request) -> Result<Request> {
        let mut current = self;
        loop {
            if let Some((node, nodes)) = current.nodes.split_first() {
                return node.build(
                    link,
                    request,
                    Next {
                        nodes,
                        outer: current.outer,
                    },
                );
            }
            match current.outer {
                Some(outer) => current = *outer,
                None => return Ok(request),
            }
        }
    }
}

/// Ordered list of request builders, first element outermost
#[derive(Debug, Clone, Default)]
pub struct RequestChain {
    nodes: Vec<Arc<dyn RequestBuilder>>,
}

impl RequestChain {
    /// Empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with a single node
    pub fn single<B>(node: B) -> Self
    where
        B: RequestBuilder + 'static,
    {
        Self::new().with(node)
    }

    /// Append `node`
    pub fn with<B>(mut self, node: B) -> Self
    where
        B: RequestBuilder + 'static,
    {
        self.nodes.push(Arc::new(node));
        self
    }

    /// Append an already shared node
    pub fn with_shared(mut self, node: Arc<dyn RequestBuilder>) -> Self {
        self.nodes.push(node);
        self
    }

    /// Nodes in execution order
    pub fn nodes(&self) -> &[Arc<dyn RequestBuilder>] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the chain has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Run the chain on `request` without continuation
    pub fn apply(&self, link: &Link, request: Request) -> Result<Request> {
        Next::new(&self.nodes).run(link, request)
    }
}

impl RequestBuilder for RequestChain {
    fn build(&self, link: &Link, request: Request, next: Next<'_>) -> Result<Request> {
        Next {
            nodes: &self.nodes,
            outer: Some(&next),
        }
        .run(link, request)
    }
}

impl From<Vec<Arc<dyn RequestBuilder>>> for RequestChain {
    fn from(nodes: Vec<Arc<dyn RequestBuilder>>) -> Self {
        Self { nodes }
    }
}

impl FromIterator<Arc<dyn RequestBuilder>> for RequestChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn RequestBuilder>>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// Node running a closure over the request
pub struct InlineRequestBuilder<F> {
    f: F,
}

impl<F> InlineRequestBuilder<F>
where
    F: Fn(Request) -> Result<Request> + Send + Sync,
{
    /// Wrap `f`
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Debug for InlineRequestBuilder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineRequestBuilder").finish_non_exhaustive()
    }
}

impl<F> RequestBuilder for InlineRequestBuilder<F>
where
    F: Fn(Request) -> Result<Request> + Send + Sync,
{
    fn build(&self, link: &Link, request: Request, next: Next<'_>) -> Result<Request> {
        let request = (self.f)(request)?;
        next.run(link, request)
    }
}

/// Sets the `Accept` header
#[derive(Debug, Clone)]
pub struct AcceptHeader {
    media_types: Vec<String>,
}

impl AcceptHeader {
    /// Accept the given media types, in order of preference
    pub fn new<I, S>(media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            media_types: media_types.into_iter().map(Into::into).collect(),
        }
    }
}

impl RequestBuilder for AcceptHeader {
    fn build(&self, link: &Link, mut request: Request, next: Next<'_>) -> Result<Request> {
        if !self.media_types.is_empty() {
            request.insert_header("accept", &self.media_types.join(", "))?;
        }
        next.run(link, request)
    }
}

/// Adds headers that earlier nodes did not set
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    headers: Vec<(String, String)>,
}

impl DefaultHeaders {
    /// No headers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl RequestBuilder for DefaultHeaders {
    fn build(&self, link: &Link, mut request: Request, next: Next<'_>) -> Result<Request> {
        for (name, value) in &self.headers {
            if !request.headers.contains_key(name.as_str()) {
                request.insert_header(name, value)?;
            }
        }
        next.run(link, request)
    }
}

/// Rejects the request when a header is missing
#[derive(Debug, Clone)]
pub struct RequireHeader {
    name: String,
}

impl RequireHeader {
    /// Require `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RequestBuilder for RequireHeader {
    fn build(&self, link: &Link, request: Request, next: Next<'_>) -> Result<Request> {
        if !request.headers.contains_key(self.name.as_str()) {
            return Err(Error::request_build(format!(
                "Required header '{}' was not supplied",
                self.name
            )));
        }
        next.run(link, request)
    }
}

/// Expands the target template with the link's parameters and merges the
/// unconsumed ones into the query string
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandTemplate;

impl RequestBuilder for ExpandTemplate {
    fn build(&self, link: &Link, mut request: Request, next: Next<'_>) -> Result<Request> {
        let parameters = link.parameters();
        let (target, unconsumed) = if template::is_templated(&request.target) {
            let expansion = template::expand(&request.target, parameters)?;
            let unconsumed = expansion.unconsumed(parameters);
            (expansion.uri, unconsumed)
        } else {
            (std::mem::take(&mut request.target), parameters.clone())
        };

        request.target = match link.merge_mode() {
            MergeMode::Merge if !unconsumed.is_empty() => {
                tracing::trace!(count = unconsumed.len(), "Merging unconsumed parameters");
                merge_query(&target, &unconsumed)
            }
            _ => target,
        };
        next.run(link, request)
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::factory::LinkFactory;
    use crate::link::{param, LinkKind};

    #[derive(Debug)]
    struct AppendTag(&'static str);

    impl RequestBuilder for AppendTag {
        fn build(&self, link: &Link, mut request: Request, next: Next<'_>) -> Result<Request> {
            request.append_header("x-tag", self.0)?;
            next.run(link, request)
        }
    }

    #[derive(Debug)]
    struct Stop;

    impl RequestBuilder for Stop {
        fn build(&self, _link: &Link, _request: Request, _next: Next<'_>) -> Result<Request> {
            Err(Error::request_build("stopped"))
        }
    }

    fn tags(request: &Request) -> Vec<String> {
        request
            .headers
            .get_all("x-tag")
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_chain_runs_in_order() {
        let link = Link::new("http://example.org/about");
        let chain = RequestChain::new()
            .with(AppendTag("a"))
            .with(AppendTag("b"))
            .with(AppendTag("c"));

        let request = chain
            .apply(&link, link.bare_request().expect("target set"))
            .expect("chain succeeds");
        assert_eq!(tags(&request), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_nested_chains_are_associative() {
        let link = Link::new("http://example.org/about");
        let bare = link.bare_request().expect("target set");

        let flat = RequestChain::new()
            .with(AppendTag("a"))
            .with(AppendTag("b"))
            .with(AppendTag("c"));
        let right = RequestChain::new()
            .with(AppendTag("a"))
            .with(RequestChain::new().with(AppendTag("b")).with(AppendTag("c")));
        let left = RequestChain::new()
            .with(RequestChain::new().with(AppendTag("a")).with(AppendTag("b")))
            .with(AppendTag("c"));

        let expected = flat.apply(&link, bare.clone()).expect("chain succeeds");
        assert_eq!(right.apply(&link, bare.clone()).expect("chain succeeds"), expected);
        assert_eq!(left.apply(&link, bare).expect("chain succeeds"), expected);
    }

    #[test]
    fn test_chain_equals_manual_application() {
        let link = Link::new("http://example.org/customer{?id}").with_parameters(param("id", 45));
        let a = AcceptHeader::new(["application/json"]);
        let b = InlineRequestBuilder::new(|request: Request| {
            request.with_header("authorization", "foo bar")
        });

        let chain = RequestChain::new().with(a.clone()).with(b);
        let chained = Next::new(chain.nodes())
            .run(&link, link.bare_request().expect("target set"))
            .expect("chain succeeds");

        let mut manual = link.bare_request().expect("target set");
        manual = a.build(&link, manual, Next::end()).expect("accept succeeds");
        manual = manual
            .with_header("authorization", "foo bar")
            .expect("valid header");

        assert_eq!(chained, manual);
    }

    #[test]
    fn test_short_circuit_skips_rest() {
        let link = Link::new("http://example.org/about");
        let chain = RequestChain::new()
            .with(AppendTag("a"))
            .with(Stop)
            .with(AppendTag("never"));

        match chain.apply(&link, link.bare_request().expect("target set")) {
            Err(Error::RequestBuild(message)) => assert_eq!(message, "stopped"),
            other => panic!("Expected Error::RequestBuild, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_short_circuit_stops_outer_chain() {
        let link = Link::new("http://example.org/about");
        let chain = RequestChain::new()
            .with(RequestChain::new().with(Stop))
            .with(AppendTag("never"));

        assert!(chain
            .apply(&link, link.bare_request().expect("target set"))
            .is_err());
    }

    #[test]
    fn test_default_headers_do_not_override() {
        let link = Link::new("http://example.org/about");
        let chain = RequestChain::new()
            .with(InlineRequestBuilder::new(|request: Request| {
                request.with_header("user-agent", "Custom/2.0")
            }))
            .with(
                DefaultHeaders::new()
                    .header("user-agent", "MyApp/1.0")
                    .header("accept-language", "en"),
            );

        let request = chain
            .apply(&link, link.bare_request().expect("target set"))
            .expect("chain succeeds");
        assert_eq!(request.header("user-agent").as_deref(), Some("Custom/2.0"));
        assert_eq!(request.header("accept-language").as_deref(), Some("en"));
    }

    #[test]
    fn test_require_header() {
        let link = Link::new("http://example.org/about");
        let chain = RequestChain::single(RequireHeader::new("authorization"));
        assert!(matches!(
            chain.apply(&link, link.bare_request().expect("target set")),
            Err(Error::RequestBuild(_))
        ));

        let chain = RequestChain::new()
            .with(InlineRequestBuilder::new(|request: Request| {
                request.with_header("authorization", "foo bar")
            }))
            .with(RequireHeader::new("authorization"));
        assert!(chain
            .apply(&link, link.bare_request().expect("target set"))
            .is_ok());
    }

    #[test]
    fn test_expand_template_plain_and_templated_targets() {
        let plain = Link::new("http://example.org/customer?format=xml")
            .with_parameters(param("id", 45));
        let request = ExpandTemplate
            .build(&plain, plain.bare_request().expect("target set"), Next::end())
            .expect("plain target");
        assert_eq!(request.target, "http://example.org/customer?format=xml&id=45");

        let stray = Link::new("http://example.org/customer}");
        assert!(matches!(
            ExpandTemplate.build(&stray, stray.bare_request().expect("target set"), Next::end()),
            Err(Error::Template(_))
        ));
    }

    #[test]
    fn test_builders_may_replace_target_and_method() {
        let mut factory = LinkFactory::new();
        factory.register(
            LinkKind::ABOUT,
            RequestChain::single(InlineRequestBuilder::new(|mut request: Request| {
                request.target = "http://mirror.example.org/about".to_string();
                request.method = Method::HEAD;
                Ok(request)
            })),
        );

        let request = factory
            .create_with_target(LinkKind::ABOUT, "http://example.org/about")
            .build_request()
            .expect("valid link");
        assert_eq!(request.target, "http://mirror.example.org/about");
        assert_eq!(request.method, Method::HEAD);
    }
}
