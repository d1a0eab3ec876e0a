//! Shared test helpers for backend integration tests
//!
//! Provides wiremock-based mock server setup for Relist backend endpoints.
//! Each helper mounts the necessary mock endpoints; [`setup_backend_mock`]
//! returns a configured client pointing at the mock server.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relist_api::{ApiClient, BackendProvider};

pub const TEST_TOKEN: &str = "test-access-token";

/// Starts a mock server and returns it with an authenticated provider
pub async fn setup_backend_mock() -> (MockServer, BackendProvider) {
    let server = MockServer::start().await;
    let client = ApiClient::with_base_url(server.uri(), Some(TEST_TOKEN.to_string()))
        .expect("build client");
    (server, BackendProvider::new(client))
}

/// Provider pointing at `server` with no credential
pub fn anonymous_provider(server: &MockServer) -> BackendProvider {
    let client = ApiClient::with_base_url(server.uri(), None).expect("build client");
    BackendProvider::new(client)
}

/// Mounts a bearer-checked JSON response for `verb path`
pub async fn mount_json(
    server: &MockServer,
    verb: &str,
    route: &str,
    status: u16,
    body: serde_json::Value,
) {
    Mock::given(method(verb))
        .and(path(route))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts an anonymous JSON response for `verb path`
pub async fn mount_anonymous_json(
    server: &MockServer,
    verb: &str,
    route: &str,
    status: u16,
    body: serde_json::Value,
) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Cookie set that looks like a logged-in marketplace session
pub fn session_cookies() -> relist_core::domain::CookieSet {
    use relist_core::domain::Cookie;
    relist_core::domain::CookieSet::new(vec![
        Cookie::new("jwt", "eyJ0eXAi", ".poshmark.com"),
        Cookie::new("_csrf", "c5rf", "poshmark.com"),
        Cookie::new("un", "closet_queen", ".poshmark.com"),
    ])
}
