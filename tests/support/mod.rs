//! Shared fixtures for integration tests: a mock identity provider and resource server.

#![allow(dead_code)]

#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use edl_downloader_core::{Config, EdlClient, RetryPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, Respond, ResponseTemplate};

use socket_guard::start_mock_server_or_skip;

pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";
pub const TOKEN: &str = "user-token";
pub const TOKEN_VALIDATION_PATH: &str = "/oauth/tokens/user";

/// Identity provider and resource server, on distinct ports.
pub struct Servers {
    pub edl: MockServer,
    pub resource: MockServer,
}

impl Servers {
    pub async fn start() -> Option<Self> {
        let edl = start_mock_server_or_skip().await?;
        let resource = start_mock_server_or_skip().await?;
        Some(Self { edl, resource })
    }

    pub fn config(&self) -> Config {
        Config::new(&self.edl.uri(), CLIENT_ID, CLIENT_SECRET).expect("valid config")
    }

    pub fn resource_url(&self, path: &str) -> String {
        format!("{}{path}", self.resource.uri())
    }

    pub fn edl_url(&self, path: &str) -> String {
        format!("{}{path}", self.edl.uri())
    }

    /// Accepts every token at the validation endpoint, expecting `calls` requests.
    pub async fn accept_tokens(&self, calls: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_VALIDATION_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(calls)
            .mount(&self.edl)
            .await;
    }

    /// Requests received by the resource server for `path`, in order.
    pub async fn resource_requests(&self, path: &str) -> Vec<Request> {
        requests_for(&self.resource, path).await
    }

    pub async fn edl_requests(&self, path: &str) -> Vec<Request> {
        requests_for(&self.edl, path).await
    }
}

async fn requests_for(server: &MockServer, path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .filter(|r| r.url.path() == path)
        .collect()
}

/// Client that retries without delay.
pub fn immediate_client(config: Config) -> EdlClient {
    let retries = config
        .max_retries()
        .unwrap_or(edl_downloader_core::DEFAULT_TOTAL_RETRIES);
    EdlClient::new(config)
        .expect("client builds")
        .with_retry_policy(RetryPolicy::immediate(retries))
}

pub fn basic_header() -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}"))
    )
}

pub fn authorization(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn user_agent(request: &Request) -> Option<String> {
    request
        .headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Matches requests carrying exactly `expected` as their Authorization header.
pub struct AuthorizationIs(pub String);

impl Match for AuthorizationIs {
    fn matches(&self, request: &Request) -> bool {
        authorization(request).as_deref() == Some(self.0.as_str())
    }
}

/// Matches requests without an Authorization header.
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

/// Responds with `failure_status` for the first `fail_count` requests, then 200 with `body`.
pub struct FlakyResponder {
    request_count: Arc<AtomicUsize>,
    fail_count: usize,
    failure_status: u16,
    body: Vec<u8>,
}

impl FlakyResponder {
    pub fn new(failure_status: u16, fail_count: usize, body: &[u8]) -> Self {
        Self {
            request_count: Arc::new(AtomicUsize::new(0)),
            fail_count,
            failure_status,
            body: body.to_vec(),
        }
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.request_count.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(self.failure_status)
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.body.clone())
        }
    }
}
