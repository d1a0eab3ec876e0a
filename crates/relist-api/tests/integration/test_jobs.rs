//! Integration tests for job start and progress endpoints

use relist_core::{
    domain::{ApiErrorKind, JobKind, JobStatus, ListingId, ProgressLevel},
    ports::{IJobStore, JobRequest},
};
use wiremock::{
    matchers::{method, path},
    Mock, ResponseTemplate,
};

use crate::common;

// ============================================================================
// start_job
// ============================================================================

#[tokio::test]
async fn test_start_inventory_fetch_returns_handle() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "POST",
        "/marketplaces/poshmark/inventory",
        200,
        serde_json::json!({"job_id": "job-123", "message": "started"}),
    )
    .await;

    let handle = provider
        .start_job(JobRequest::InventoryFetch)
        .await
        .expect("start_job failed");

    assert_eq!(handle.id.as_str(), "job-123");
    assert_eq!(handle.kind, JobKind::InventoryFetch);
}

#[tokio::test]
async fn test_start_publish_uses_listing_path() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "POST",
        "/marketplaces/poshmark/77/publish",
        202,
        serde_json::json!({"job_id": "pub-1"}),
    )
    .await;

    let handle = provider
        .start_job(JobRequest::Publish {
            listing_id: ListingId::new(77).unwrap(),
        })
        .await
        .expect("start_job failed");

    assert_eq!(handle.kind, JobKind::Publish);
    assert_eq!(handle.id.as_str(), "pub-1");
}

#[tokio::test]
async fn test_start_without_job_id_is_protocol_error() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "POST",
        "/marketplaces/poshmark/inventory",
        200,
        serde_json::json!({"message": "queued"}),
    )
    .await;

    let err = provider
        .start_job(JobRequest::InventoryFetch)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Protocol);
    assert!(err.body().unwrap().contains("queued"));
}

#[tokio::test]
async fn test_start_without_token_makes_no_request() {
    let server = wiremock::MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = common::anonymous_provider(&server);
    let err = provider
        .start_job(JobRequest::InventoryFetch)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Auth);
}

#[tokio::test]
async fn test_start_rejected_by_backend_is_server_error() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "POST",
        "/marketplaces/poshmark/inventory",
        400,
        serde_json::json!({"detail": "Poshmark account not connected"}),
    )
    .await;

    let err = provider
        .start_job(JobRequest::InventoryFetch)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Server);
    assert_eq!(err.message(), "Poshmark account not connected");
}

#[tokio::test]
async fn test_start_against_closed_port_is_network_error() {
    let uri = {
        let server = wiremock::MockServer::builder().start().await;
        server.uri()
    };
    let client = relist_api::ApiClient::with_base_url(uri, Some("t".into())).unwrap();
    let provider = relist_api::BackendProvider::new(client);

    let err = provider
        .start_job(JobRequest::InventoryFetch)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Network);
    assert!(err.is_transient());
}

// ============================================================================
// get_progress
// ============================================================================

#[tokio::test]
async fn test_progress_parses_messages_and_result() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "GET",
        "/marketplaces/poshmark/inventory-progress/job-123",
        200,
        serde_json::json!({
            "status": "completed",
            "messages": [
                {"message": "Logging in", "level": "info", "timestamp": "2024-05-01T12:00:00.123456"},
                {"message": "Found 12 items", "level": "success", "timestamp": "2024-05-01T12:00:05"}
            ],
            "result": {"items": 12},
            "latest_message": {"message": "Found 12 items", "level": "success"}
        }),
    )
    .await;

    let handle = relist_core::ports::JobHandle::new(
        relist_core::domain::JobId::new("job-123".into()).unwrap(),
        JobKind::InventoryFetch,
    );
    let snapshot = provider.get_progress(&handle).await.expect("progress");

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.messages.len(), 2);
    assert!(snapshot.messages[0].timestamp.is_some());
    assert_eq!(snapshot.messages[1].level, ProgressLevel::Success);
    assert_eq!(snapshot.result().unwrap()["items"], 12);
    assert_eq!(snapshot.latest().unwrap().message, "Found 12 items");
}

#[tokio::test]
async fn test_publish_progress_uses_publish_endpoint() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "GET",
        "/publish-progress/pub-1",
        200,
        serde_json::json!({"status": "pending", "messages": []}),
    )
    .await;

    let handle = relist_core::ports::JobHandle::new(
        relist_core::domain::JobId::new("pub-1".into()).unwrap(),
        JobKind::Publish,
    );
    let snapshot = provider.get_progress(&handle).await.expect("progress");

    assert_eq!(snapshot.status, JobStatus::Pending);
    assert!(snapshot.messages.is_empty());
}

#[tokio::test]
async fn test_progress_non_success_is_protocol_error_with_body() {
    let (server, provider) = common::setup_backend_mock().await;
    Mock::given(method("GET"))
        .and(path("/publish-progress/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"detail":"Job not found"}"#))
        .mount(&server)
        .await;

    let handle = relist_core::ports::JobHandle::new(
        relist_core::domain::JobId::new("gone".into()).unwrap(),
        JobKind::Publish,
    );
    let err = provider.get_progress(&handle).await.unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Protocol);
    assert_eq!(err.body(), Some(r#"{"detail":"Job not found"}"#));
}

#[tokio::test]
async fn test_progress_unauthorized_is_auth_error() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "GET",
        "/publish-progress/pub-2",
        401,
        serde_json::json!({"detail": "Token expired"}),
    )
    .await;

    let handle = relist_core::ports::JobHandle::new(
        relist_core::domain::JobId::new("pub-2".into()).unwrap(),
        JobKind::Publish,
    );
    let err = provider.get_progress(&handle).await.unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Auth);
    assert_eq!(err.message(), "Token expired");
}
