//! Link factory

use std::collections::HashMap;
use std::sync::Arc;

use crate::builder::{AcceptHeader, DefaultHeaders, RequestChain, RequireHeader};
use crate::error::{Error, Result};
use crate::link::{Link, LinkKind, MergeMode};
use crate::params::Parameters;
use crate::settings::Settings;

/// Per-kind behaviour besides the request chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindOptions {
    /// Whether unconsumed parameters end up in the query string by default
    pub query_bearing: bool,
}

impl Default for KindOptions {
    fn default() -> Self {
        Self {
            query_bearing: true,
        }
    }
}

impl KindOptions {
    /// Merge mode links of this kind start with
    pub fn merge_mode(&self) -> MergeMode {
        if self.query_bearing {
            MergeMode::Merge
        } else {
            MergeMode::Drop
        }
    }
}

fn validate_header(kind: &str, name: &str) -> Result<()> {
    http::HeaderName::from_bytes(name.as_bytes())
        .map(|_| ())
        .map_err(|e| {
            Error::request_build(format!("Invalid header '{name}' for kind {kind}: {e}"))
        })
}

#[derive(Debug, Clone, Default)]
struct Registration {
    chain: Arc<RequestChain>,
    options: KindOptions,
}

/// Registry of request builder chains by link kind
///
/// Register everything up front, then share the factory; registration takes
/// `&mut self` so it cannot race with link creation.
#[derive(Debug, Clone, Default)]
pub struct LinkFactory {
    kinds: HashMap<LinkKind, Registration>,
}

impl LinkFactory {
    /// Factory with no registrations
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory configured from `settings`
    ///
    /// Each configured kind gets `[DefaultHeaders, AcceptHeader, RequireHeader..]`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut factory = Self::new();

        for (name, kind) in &settings.kinds {
            let mut defaults = DefaultHeaders::new();
            if let Some(user_agent) = &settings.user_agent {
                defaults = defaults.header("user-agent", user_agent);
            }
            for (header, value) in &kind.headers {
                validate_header(name, header)?;
                defaults = defaults.header(header, value);
            }

            let mut chain = RequestChain::new().with(defaults);
            if !kind.accept.is_empty() {
                chain = chain.with(AcceptHeader::new(kind.accept.iter().cloned()));
            }
            for header in &kind.required_headers {
                validate_header(name, header)?;
                chain = chain.with(RequireHeader::new(header));
            }

            tracing::debug!(kind = %name, nodes = chain.len(), "Registering configured link kind");
            factory.register_with(
                LinkKind::new(name),
                chain,
                KindOptions {
                    query_bearing: kind.query_bearing,
                },
            );
        }

        Ok(factory)
    }

    /// Register `chain` for `kind`, replacing any earlier registration
    pub fn register(&mut self, kind: LinkKind, chain: impl Into<RequestChain>) {
        self.register_with(kind, chain, KindOptions::default());
    }

    /// Register `chain` and `options` for `kind`
    pub fn register_with(
        &mut self,
        kind: LinkKind,
        chain: impl Into<RequestChain>,
        options: KindOptions,
    ) {
        self.kinds.insert(
            kind,
            Registration {
                chain: Arc::new(chain.into()),
                options,
            },
        );
    }

    /// Whether `kind` has a registration
    pub fn is_registered(&self, kind: &LinkKind) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Options for `kind`, defaults when unregistered
    pub fn options(&self, kind: &LinkKind) -> KindOptions {
        self.kinds
            .get(kind)
            .map(|registration| registration.options)
            .unwrap_or_default()
    }

    /// New link of `kind` without a target
    ///
    /// Unregistered kinds get an empty chain.
    pub fn create(&self, kind: LinkKind) -> Link {
        let registration = self.kinds.get(&kind).cloned().unwrap_or_default();
        Link::bound(
            kind,
            registration.chain,
            registration.options.merge_mode(),
        )
    }

    /// New link of `kind` pointing at `target`
    pub fn create_with_target(&self, kind: LinkKind, target: impl Into<String>) -> Link {
        self.create(kind).with_target(target)
    }

    /// Derive a link with `bindings` applied
    ///
    /// `merge` of `None` keeps the default of the link's kind.
    pub fn derive_parameters(
        &self,
        link: &Link,
        bindings: Parameters,
        merge: Option<MergeMode>,
    ) -> Link {
        let merge = merge.unwrap_or_else(|| self.options(link.kind()).merge_mode());
        link.with_parameters_merge(bindings, merge)
    }
}
