//! Integration tests for marketplace account endpoints

use relist_core::{
    domain::{ApiErrorKind, ListingId, Marketplace},
    ports::IMarketplaceConnector,
};
use wiremock::{
    matchers::{method, path},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_connect_with_cookies_posts_bare_array() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "POST",
        "/marketplaces/poshmark/connect/cookies",
        200,
        serde_json::json!({"status": "connected", "username": "closet_queen"}),
    )
    .await;

    let receipt = provider
        .connect_with_cookies(&common::session_cookies())
        .await
        .expect("connect failed");

    assert_eq!(receipt.username.as_deref(), Some("closet_queen"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.is_array());
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_connection_status_for_each_marketplace() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "GET",
        "/marketplaces/poshmark/status",
        200,
        serde_json::json!({"connected": true, "marketplace": "poshmark", "username": "closet_queen"}),
    )
    .await;
    common::mount_json(
        &server,
        "GET",
        "/marketplaces/ebay/status",
        200,
        serde_json::json!({"connected": false, "marketplace": "ebay", "username": null}),
    )
    .await;

    let posh = provider
        .connection_status(Marketplace::Poshmark)
        .await
        .expect("poshmark status");
    let ebay = provider
        .connection_status(Marketplace::Ebay)
        .await
        .expect("ebay status");

    assert!(posh.connected);
    assert_eq!(posh.username.as_deref(), Some("closet_queen"));
    assert!(!ebay.connected);
    assert_eq!(ebay.marketplace, Marketplace::Ebay);
}

#[tokio::test]
async fn test_disconnect_sends_delete() {
    let (server, provider) = common::setup_backend_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/marketplaces/poshmark/disconnect"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"message": "Poshmark account disconnected"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    provider
        .disconnect(Marketplace::Poshmark)
        .await
        .expect("disconnect failed");
}

#[tokio::test]
async fn test_publish_ebay_returns_receipt() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "POST",
        "/marketplaces/ebay/5/publish",
        200,
        serde_json::json!({
            "message": "Processed",
            "listing_id": "110552234",
            "url": "https://www.ebay.com/itm/110552234"
        }),
    )
    .await;

    let receipt = provider
        .publish_ebay(ListingId::new(5).unwrap())
        .await
        .expect("publish failed");

    assert_eq!(receipt.external_id.as_deref(), Some("110552234"));
    assert_eq!(
        receipt.url.as_deref(),
        Some("https://www.ebay.com/itm/110552234")
    );
}

#[tokio::test]
async fn test_publish_ebay_failure_surfaces_nested_detail() {
    let (server, provider) = common::setup_backend_mock().await;
    common::mount_json(
        &server,
        "POST",
        "/marketplaces/ebay/5/publish",
        400,
        serde_json::json!({"detail": {"message": "eBay business policies not configured", "error": "MISSING_POLICIES"}}),
    )
    .await;

    let err = provider
        .publish_ebay(ListingId::new(5).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Server);
    assert_eq!(err.message(), "eBay business policies not configured");
}
