//! Response dispatch table

use std::collections::HashMap;
use std::ops::RangeInclusive;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::handler::{ResponseChain, StatusCheck};
use crate::link::Link;
use crate::transport::Response;

static GLOBAL: Lazy<DispatchTable> = Lazy::new(DispatchTable::new);

/// Which responses a handler chain is registered for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSelector {
    /// Exactly this status code
    Exact(u16),
    /// Any status code in the inclusive range
    Range(RangeInclusive<u16>),
    /// Every response no other entry selects
    Default,
}

impl From<u16> for StatusSelector {
    fn from(code: u16) -> Self {
        Self::Exact(code)
    }
}

impl From<RangeInclusive<u16>> for StatusSelector {
    fn from(range: RangeInclusive<u16>) -> Self {
        Self::Range(range)
    }
}

/// Status code keyed routing of responses to handler chains
///
/// Exactly one chain runs per response: the exact code entry if there is
/// one, else the first registered range containing the code, else the default
/// chain, which rejects anything outside `2xx`.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    preprocessor: ResponseChain,
    exact: HashMap<u16, ResponseChain>,
    ranges: Vec<(RangeInclusive<u16>, ResponseChain)>,
    default: ResponseChain,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self {
            preprocessor: ResponseChain::new(),
            exact: HashMap::new(),
            ranges: Vec::new(),
            default: ResponseChain::single(StatusCheck),
        }
    }
}

impl DispatchTable {
    /// Table with only the default chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared table with no registrations, used by [`follow`](crate::follow)
    pub fn global() -> &'static DispatchTable {
        &GLOBAL
    }

    /// Register `chain` for `selector`
    ///
    /// Exact codes replace an earlier registration. Ranges are kept in
    /// registration order.
    pub fn register(&mut self, selector: StatusSelector, chain: impl Into<ResponseChain>) {
        let chain = chain.into();
        match selector {
            StatusSelector::Exact(code) => {
                self.exact.insert(code, chain);
            }
            StatusSelector::Range(range) => self.ranges.push((range, chain)),
            StatusSelector::Default => self.default = chain,
        }
    }

    /// Builder form of [`DispatchTable::register`]
    pub fn with(mut self, selector: StatusSelector, chain: impl Into<ResponseChain>) -> Self {
        self.register(selector, chain);
        self
    }

    /// Replace the default chain
    pub fn set_default(&mut self, chain: impl Into<ResponseChain>) {
        self.default = chain.into();
    }

    /// Append `chain` to the handlers run on every response before lookup
    pub fn add_preprocessor(&mut self, chain: impl Into<ResponseChain>) {
        let preprocessor = std::mem::take(&mut self.preprocessor);
        self.preprocessor = preprocessor.with(chain.into());
    }

    /// Chain selected for `status`
    pub fn select(&self, status: u16) -> &ResponseChain {
        if let Some(chain) = self.exact.get(&status) {
            return chain;
        }
        self.ranges
            .iter()
            .find(|(range, _)| range.contains(&status))
            .map(|(_, chain)| chain)
            .unwrap_or(&self.default)
    }

    /// Route `response` through the preprocessors and the selected chain
    pub async fn dispatch(&self, link: &Link, response: Response) -> Result<Response> {
        let response = self.preprocessor.apply(link, response).await?;
        let status = response.status();
        let chain = self.select(status);
        tracing::debug!(status, handlers = chain.len(), "Dispatching response");
        chain.apply(link, response).await
    }
}
