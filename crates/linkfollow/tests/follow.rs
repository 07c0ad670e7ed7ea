//! End to end link following over an in-memory transport

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use linkfollow::{
    follow_with, param, AsyncHandler, DispatchTable, Error, FollowLinkExt, InlineRequestBuilder,
    Link, LinkFactory, LinkKind, MergeMode, Request, RequestChain, Response, ResponseChain,
    Settings, StatusSelector, Transport, TransportError,
};

/// Echoes the request line back as the response body
#[derive(Debug, Default)]
struct EchoTransport {
    sent: Mutex<Vec<Request>>,
}

#[async_trait]
impl Transport for EchoTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let body = format!("{} {}", request.method, request.target);
        let status = if request.target.contains("/missing") {
            404
        } else {
            200
        };
        self.sent.lock().expect("lock").push(request);
        Ok(Response::new(status).with_body(body))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const SETTINGS: &str = r#"
user_agent = "MyApp/1.0"

[kinds.stylesheet]
accept = ["text/css"]
query_bearing = false

[kinds.stylesheet.headers]
accept-encoding = "gzip"

[kinds.about]
required_headers = ["authorization"]
"#;

#[tokio::test]
async fn test_settings_driven_factory() {
    init_tracing();
    let settings = Settings::from_toml_str(SETTINGS).expect("valid settings");
    let factory = LinkFactory::from_settings(&settings).expect("factory from settings");
    let transport = EchoTransport::default();

    let stylesheet =
        factory.create_with_target(LinkKind::STYLESHEET, "http://example.org/site.css");
    let stylesheet = factory.derive_parameters(&stylesheet, param("v", 2), None);
    transport
        .follow_link(&stylesheet)
        .await
        .expect("stylesheet fetched");

    let sent = transport.sent.lock().expect("lock").clone();
    assert_eq!(sent[0].target, "http://example.org/site.css");
    assert_eq!(sent[0].header("accept").as_deref(), Some("text/css"));
    assert_eq!(sent[0].header("accept-encoding").as_deref(), Some("gzip"));
    assert_eq!(sent[0].header("user-agent").as_deref(), Some("MyApp/1.0"));

    let about = factory.create_with_target(LinkKind::ABOUT, "http://example.org/about");
    assert!(matches!(
        transport.follow_link(&about).await,
        Err(Error::RequestBuild(_))
    ));
    assert_eq!(transport.sent.lock().expect("lock").len(), 1);
}

#[test]
fn test_code_registration_replaces_settings_chain() {
    init_tracing();
    let settings = Settings::from_toml_str(SETTINGS).expect("valid settings");
    let mut factory = LinkFactory::from_settings(&settings).expect("factory from settings");

    factory.register(
        LinkKind::ABOUT,
        RequestChain::new()
            .with(InlineRequestBuilder::new(|request: Request| {
                request.with_header("authorization", "Bearer token")
            }))
            .with(RequestChain::single(InlineRequestBuilder::new(
                |request: Request| request.with_header("user-agent", "Other/2.0"),
            ))),
    );

    let request = factory
        .create_with_target(LinkKind::ABOUT, "http://example.org/about")
        .build_request()
        .expect("valid link");
    assert_eq!(request.header("authorization").as_deref(), Some("Bearer token"));
    assert_eq!(request.header("user-agent").as_deref(), Some("Other/2.0"));
}

#[tokio::test]
async fn test_update_and_remove_query_parameters() {
    init_tracing();
    let transport = EchoTransport::default();
    let table = DispatchTable::new();
    let link = Link::new("http://example.org/customer?format=xml&id=23");

    let mut parameters = link.query_parameters();
    parameters.insert("id", 45);
    let response = follow_with(&link.with_parameters(parameters), &transport, &table)
        .await
        .expect("updated");
    assert_eq!(
        response.text().expect("utf-8"),
        "GET http://example.org/customer?format=xml&id=45"
    );

    let mut parameters = link.query_parameters();
    parameters.remove("format");
    let response = follow_with(&link.with_parameters(parameters), &transport, &table)
        .await
        .expect("removed");
    assert_eq!(
        response.text().expect("utf-8"),
        "GET http://example.org/customer?id=23"
    );
}

#[tokio::test]
async fn test_async_handler_on_not_found() {
    init_tracing();
    let transport = EchoTransport::default();
    let misses = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&misses);

    let table = DispatchTable::new().with(
        StatusSelector::Exact(404),
        ResponseChain::single(AsyncHandler::new(move |response: Response| {
            let counter = Arc::clone(&counter);
            async move {
                *counter.lock().expect("lock") += 1;
                Ok::<_, Error>(response.with_body("fallback"))
            }
        })),
    );

    let link = Link::new("http://example.org/missing/{id}")
        .with_parameters_merge(param("id", 7).with("trace", true), MergeMode::Drop);
    let response = transport
        .follow_link_with(&link, &table)
        .await
        .expect("404 handled");

    assert_eq!(response.status(), 404);
    assert_eq!(response.text().expect("utf-8"), "fallback");
    assert_eq!(*misses.lock().expect("lock"), 1);
    assert_eq!(
        transport.sent.lock().expect("lock")[0].target,
        "http://example.org/missing/7"
    );
}
