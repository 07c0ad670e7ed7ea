//! Hypermedia link following
//!
//! A [`Link`] describes an HTTP interaction: target (possibly a URI template),
//! method, parameters and payload. A [`LinkFactory`] binds each link kind to a
//! [`RequestChain`] of builders that turn the link into a [`Request`]. A
//! [`Transport`] sends the request, and the [`Response`] is routed by status
//! code through a [`DispatchTable`] of [`ResponseChain`]s.
//!
//! # Example
//!
//! ```no_run
//! use linkfollow::{
//!     follow_with, param, AcceptHeader, ActionHandler, DispatchTable, LinkFactory, LinkKind,
//!     RequestChain, Response, ResponseChain, StatusSelector, Transport,
//! };
//!
//! async fn example(transport: &dyn Transport) -> linkfollow::Result<()> {
//!     let mut factory = LinkFactory::new();
//!     factory.register(
//!         LinkKind::RELATED,
//!         RequestChain::single(AcceptHeader::new(["application/json"])),
//!     );
//!
//!     let mut table = DispatchTable::new();
//!     table.register(
//!         StatusSelector::Exact(200),
//!         ResponseChain::single(ActionHandler::new(|response: &Response| {
//!             println!("{}", response.text().unwrap_or_default());
//!         })),
//!     );
//!
//!     let customer =
//!         factory.create_with_target(LinkKind::RELATED, "http://example.org/customer/{id}");
//!     let link = factory.derive_parameters(&customer, param("id", 45), None);
//!     follow_with(&link, transport, &table).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod builder;
mod dispatch;
mod error;
mod exchange;
mod factory;
mod handler;
mod link;
mod params;
mod query;
mod settings;
mod template;
mod transport;

pub use builder::{
    AcceptHeader, DefaultHeaders, ExpandTemplate, InlineRequestBuilder, Next, RequestBuilder,
    RequestChain, RequireHeader,
};
pub use dispatch::{DispatchTable, StatusSelector};
pub use error::{Error, Result, TemplateError, TransportError};
pub use exchange::{follow, follow_cancellable, follow_with, FollowLinkExt};
pub use factory::{KindOptions, LinkFactory};
pub use handler::{
    ActionHandler, AsyncHandler, InlineHandler, ResponseChain, ResponseHandler, ResponseNext,
    StatusCheck,
};
pub use link::{param, Link, LinkKind, MergeMode};
pub use params::{ParamValue, Parameters};
pub use query::{merge_query, query_parameters};
pub use settings::{KindSettings, Settings};
pub use template::{expand, is_templated, Expansion};
pub use tokio_util::sync::CancellationToken;
pub use transport::{permits_body, Payload, Request, Response, Transport};
