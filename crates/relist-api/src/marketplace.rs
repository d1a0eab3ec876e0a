//! Marketplace account endpoints
//!
//! Direct cookie connect, connection status, disconnect, and the
//! synchronous eBay publish.

use relist_core::{
    domain::{
        cookie::CookieSet, errors::ApiError, newtypes::ListingId, operation::Marketplace,
    },
    ports::{ConnectReceipt, ConnectionStatus, PublishReceipt},
};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{ApiClient, StatusMapping};

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    connected: bool,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EbayPublishResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    listing_id: Option<serde_json::Value>,
    #[serde(default)]
    url: Option<String>,
}

/// Posts a cookie list to the authenticated direct connect endpoint
///
/// The body is the bare cookie array.
pub async fn connect_with_cookies(
    client: &ApiClient,
    cookies: &CookieSet,
) -> Result<ConnectReceipt, ApiError> {
    let builder = client
        .authed(Method::POST, "/marketplaces/poshmark/connect/cookies")?
        .json(cookies.as_slice());
    let response: ConnectResponse = client.send_json(builder, StatusMapping::Server).await?;

    info!(cookies = cookies.len(), username = ?response.username, "Poshmark connected");
    Ok(ConnectReceipt {
        username: response.username,
    })
}

/// Reads whether the user has a stored session for `marketplace`
pub async fn connection_status(
    client: &ApiClient,
    marketplace: Marketplace,
) -> Result<ConnectionStatus, ApiError> {
    let path = format!("/marketplaces/{}/status", marketplace);
    let builder = client.authed(Method::GET, &path)?;
    let response: StatusResponse = client.send_json(builder, StatusMapping::Server).await?;

    debug!(%marketplace, connected = response.connected, "Connection status");
    Ok(ConnectionStatus {
        marketplace,
        connected: response.connected,
        username: response.username,
    })
}

/// Drops the stored session for `marketplace`
pub async fn disconnect(client: &ApiClient, marketplace: Marketplace) -> Result<(), ApiError> {
    let path = format!("/marketplaces/{}/disconnect", marketplace);
    let builder = client.authed(Method::DELETE, &path)?;
    client.send(builder, StatusMapping::Server).await?;
    info!(%marketplace, "Marketplace disconnected");
    Ok(())
}

/// Publishes a listing to eBay in one request
pub async fn publish_ebay(
    client: &ApiClient,
    listing_id: ListingId,
) -> Result<PublishReceipt, ApiError> {
    let path = format!("/marketplaces/ebay/{}/publish", listing_id);
    let builder = client.authed(Method::POST, &path)?;
    let response: EbayPublishResponse = client.send_json(builder, StatusMapping::Server).await?;

    let external_id = match response.listing_id {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    info!(%listing_id, external_id = ?external_id, "Published to eBay");
    Ok(PublishReceipt {
        external_id,
        url: response.url,
        message: response.message,
    })
}
