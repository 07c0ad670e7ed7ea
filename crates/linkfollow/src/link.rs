//! Link

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::instrument;
use url::Url;

use crate::builder::{ExpandTemplate, Next, RequestBuilder, RequestChain};
use crate::error::{Error, Result};
use crate::params::{ParamValue, Parameters};
use crate::query;
use crate::transport::{permits_body, Payload, Request};

/// Link kind, the key a [`LinkFactory`](crate::LinkFactory) registers chains under
///
/// Kinds are plain tags; two links of different kinds only differ by the
/// request builder chain bound to them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkKind(Cow<'static, str>);

impl LinkKind {
    /// Generic link with no particular relation
    pub const LINK: Self = Self::from_static("link");
    /// `about` relation
    pub const ABOUT: Self = Self::from_static("about");
    /// `alternate` relation
    pub const ALTERNATE: Self = Self::from_static("alternate");
    /// `collection` relation
    pub const COLLECTION: Self = Self::from_static("collection");
    /// `edit` relation
    pub const EDIT: Self = Self::from_static("edit");
    /// `item` relation
    pub const ITEM: Self = Self::from_static("item");
    /// `next` relation
    pub const NEXT: Self = Self::from_static("next");
    /// `related` relation
    pub const RELATED: Self = Self::from_static("related");
    /// `search` relation
    pub const SEARCH: Self = Self::from_static("search");
    /// `self` relation
    pub const SELF: Self = Self::from_static("self");
    /// `stylesheet` relation
    pub const STYLESHEET: Self = Self::from_static("stylesheet");

    /// Kind from a static name
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Kind from any name
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Name of the kind
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LinkKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for LinkKind {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// What happens to parameters no template placeholder consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMode {
    /// Merge them into the query string, [`ParamValue::Absent`] removes
    #[default]
    Merge,
    /// Ignore them
    Drop,
}

/// Description of an HTTP interaction before it becomes a request
///
/// A link is a value: every change produces a new link, so one link can serve
/// as the template for any number of requests.
///
/// ```
/// use linkfollow::{Link, Parameters};
///
/// let customer = Link::new("http://example.org/customer/{id}");
/// let request = customer
///     .with_parameters(Parameters::new().with("id", 45))
///     .build_request()
///     .expect("valid link");
/// assert_eq!(request.target, "http://example.org/customer/45");
/// ```
#[derive(Debug, Clone)]
pub struct Link {
    kind: LinkKind,
    target: Option<String>,
    method: Method,
    parameters: Parameters,
    merge: MergeMode,
    payload: Option<Payload>,
    chain: Arc<RequestChain>,
}

impl Link {
    /// Generic link to `target` with no request builders
    pub fn new(target: impl Into<String>) -> Self {
        Self::bound(LinkKind::LINK, Arc::new(RequestChain::new()), MergeMode::Merge)
            .with_target(target)
    }

    /// Link without target, bound to `chain`
    pub(crate) fn bound(kind: LinkKind, chain: Arc<RequestChain>, merge: MergeMode) -> Self {
        Self {
            kind,
            target: None,
            method: Method::GET,
            parameters: Parameters::new(),
            merge,
            payload: None,
            chain,
        }
    }

    /// Kind tag
    pub fn kind(&self) -> &LinkKind {
        &self.kind
    }

    /// Target URI, possibly templated
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Parameter bindings
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Merge mode for unconsumed parameters
    pub fn merge_mode(&self) -> MergeMode {
        self.merge
    }

    /// Request body
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Request builder chain bound to this link
    pub fn chain(&self) -> &RequestChain {
        &self.chain
    }

    /// Same link pointing at `target`
    pub fn with_target(&self, target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..self.clone()
        }
    }

    /// Same link using `method`
    pub fn with_method(&self, method: Method) -> Self {
        Self {
            method,
            ..self.clone()
        }
    }

    /// Same link with `bindings` laid over the current parameters
    pub fn with_parameters(&self, bindings: Parameters) -> Self {
        Self {
            parameters: self.parameters.merged(&bindings),
            ..self.clone()
        }
    }

    /// Same link with `bindings` laid over the current parameters and the
    /// given merge mode
    pub fn with_parameters_merge(&self, bindings: Parameters, merge: MergeMode) -> Self {
        Self {
            parameters: self.parameters.merged(&bindings),
            merge,
            ..self.clone()
        }
    }

    /// Same link carrying `payload`
    pub fn with_payload(&self, payload: Payload) -> Self {
        Self {
            payload: Some(payload),
            ..self.clone()
        }
    }

    /// Same link without a payload
    pub fn without_payload(&self) -> Self {
        Self {
            payload: None,
            ..self.clone()
        }
    }

    /// Parameters currently present in the target's query string
    ///
    /// Edit the result and pass it back through [`Link::with_parameters`] to
    /// update or, with [`Parameters::remove`], drop existing values.
    pub fn query_parameters(&self) -> Parameters {
        self.target
            .as_deref()
            .map(query::query_parameters)
            .unwrap_or_default()
    }

    /// Request carrying only the link's method, raw target and payload
    pub fn bare_request(&self) -> Result<Request> {
        let target = self
            .target
            .as_deref()
            .ok_or_else(|| Error::request_build(format!("{} link has no target", self.kind)))?;

        let mut request = Request::new(self.method.clone(), target);
        request.payload = self.payload.clone();
        Ok(request)
    }

    /// Run the bound chain and return a request ready for a transport
    ///
    /// Template expansion and query merge always run first, followed by the
    /// registered builders in order. The final target must be an absolute URL.
    #[instrument(skip_all, fields(kind = %self.kind, method = %self.method))]
    pub fn build_request(&self) -> Result<Request> {
        let request = self.bare_request()?;
        let request = ExpandTemplate.build(self, request, Next::new(self.chain.nodes()))?;

        Url::parse(&request.target).map_err(|e| {
            Error::request_build(format!("Invalid target '{}': {e}", request.target))
        })?;

        if request.payload.is_some() && !permits_body(&request.method) {
            return Err(Error::request_build(format!(
                "{} requests cannot carry a payload",
                request.method
            )));
        }

        tracing::debug!(target_uri = %request.target, "Built request");
        Ok(request)
    }
}

/// Bind a single parameter, shorthand for one-off derivations
pub fn param(name: impl Into<String>, value: impl Into<ParamValue>) -> Parameters {
    Parameters::new().with(name, value)
}
