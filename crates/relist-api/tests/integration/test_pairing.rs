//! Integration tests for the pairing endpoints

use relist_core::{
    domain::{ApiErrorKind, PairingCode, PairingStatus},
    ports::IPairingService,
};
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_request_code_returns_ticket() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "POST",
        "/api/auth/pairing-code",
        200,
        serde_json::json!({
            "code": "482913",
            "expires_at": "2024-05-01T12:10:00.000001",
            "expires_in_seconds": 600
        }),
    )
    .await;

    let ticket = provider.request_code().await.expect("request_code failed");

    assert_eq!(ticket.code.as_str(), "482913");
    assert_eq!(ticket.expires_in_seconds, 600);
    assert!(ticket.expires_at.is_some());
}

#[tokio::test]
async fn test_request_code_requires_token() {
    let server = wiremock::MockServer::start().await;
    let provider = common::anonymous_provider(&server);

    let err = provider.request_code().await.unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Auth);
}

#[tokio::test]
async fn test_malformed_code_from_backend_is_protocol_error() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "POST",
        "/api/auth/pairing-code",
        200,
        serde_json::json!({"code": "12ab", "expires_in_seconds": 600}),
    )
    .await;

    let err = provider.request_code().await.unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Protocol);
}

#[tokio::test]
async fn test_pairing_status_is_anonymous() {
    let server = wiremock::MockServer::start().await;
    common::mount_anonymous_json(
        &server,
        "GET",
        "/api/auth/pairing-status/482913",
        200,
        serde_json::json!({
            "status": "success",
            "message": "Cookies received",
            "cookies_received": true
        }),
    )
    .await;
    let provider = common::anonymous_provider(&server);

    let code: PairingCode = "482913".parse().unwrap();
    let report = provider.pairing_status(&code).await.expect("status failed");

    assert_eq!(report.status, PairingStatus::Success);
    assert!(report.cookies_received);
    assert_eq!(report.message.as_deref(), Some("Cookies received"));
}

#[tokio::test]
async fn test_pairing_status_not_found() {
    let server = wiremock::MockServer::start().await;
    common::mount_anonymous_json(
        &server,
        "GET",
        "/api/auth/pairing-status/000000",
        200,
        serde_json::json!({"status": "not_found", "message": "Pairing code not found"}),
    )
    .await;
    let provider = common::anonymous_provider(&server);

    let code: PairingCode = "000000".parse().unwrap();
    let report = provider.pairing_status(&code).await.expect("status failed");

    assert_eq!(report.status, PairingStatus::NotFound);
    assert!(!report.cookies_received);
}

#[tokio::test]
async fn test_sync_extension_posts_code_cookies_and_username() {
    let server = wiremock::MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/sync-extension"))
        .and(body_partial_json(serde_json::json!({
            "pairing_code": "482913",
            "username": "closet_queen"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "message": "Cookies synced successfully",
            "username": "closet_queen"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let provider = common::anonymous_provider(&server);

    let code: PairingCode = "482913".parse().unwrap();
    let cookies = common::session_cookies();
    let receipt = provider
        .sync_extension(&code, &cookies, cookies.username())
        .await
        .expect("sync failed");

    assert_eq!(receipt.username.as_deref(), Some("closet_queen"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["cookies"].as_array().unwrap().len(), 3);
    assert_eq!(body["cookies"][0]["name"], "jwt");
}

#[tokio::test]
async fn test_sync_extension_expired_code_is_server_error() {
    let server = wiremock::MockServer::start().await;
    common::mount_anonymous_json(
        &server,
        "POST",
        "/api/auth/sync-extension",
        404,
        serde_json::json!({"detail": "Invalid or expired pairing code"}),
    )
    .await;
    let provider = common::anonymous_provider(&server);

    let code: PairingCode = "482913".parse().unwrap();
    let err = provider
        .sync_extension(&code, &common::session_cookies(), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        relist_core::domain::ApiError::Server {
            status: 404,
            body: r#"{"detail":"Invalid or expired pairing code"}"#.to_string()
        }
    );
    assert_eq!(err.message(), "Invalid or expired pairing code");
}
