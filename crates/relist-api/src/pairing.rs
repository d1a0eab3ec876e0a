//! Pairing endpoints
//!
//! `pairing-code` is the only authenticated call here. Status reads and
//! the extension sync are anonymous: the six-digit code is the credential.

use relist_core::{
    domain::{
        cookie::{Cookie, CookieSet},
        errors::ApiError,
        newtypes::PairingCode,
        pairing::{PairingStatusReport, PairingTicket},
    },
    ports::ExtensionSyncReceipt,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{ApiClient, StatusMapping};

/// Request body for `POST /api/auth/sync-extension`
#[derive(Debug, Serialize)]
struct SyncExtensionRequest<'a> {
    pairing_code: &'a str,
    cookies: &'a [Cookie],
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SyncExtensionResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// Requests a fresh pairing code for the logged-in user
pub async fn request_code(client: &ApiClient) -> Result<PairingTicket, ApiError> {
    let builder = client.authed(Method::POST, "/api/auth/pairing-code")?;
    let ticket: PairingTicket = client.send_json(builder, StatusMapping::Server).await?;
    info!(
        code = %ticket.code,
        expires_in = ticket.expires_in_seconds,
        "Pairing code issued"
    );
    Ok(ticket)
}

/// Reads the backend status of a pairing code
pub async fn pairing_status(
    client: &ApiClient,
    code: &PairingCode,
) -> Result<PairingStatusReport, ApiError> {
    let path = format!("/api/auth/pairing-status/{}", code);
    let builder = client.request(Method::GET, &path);
    let report: PairingStatusReport = client.send_json(builder, StatusMapping::Server).await?;
    debug!(
        code = %code,
        status = %report.status,
        cookies_received = report.cookies_received,
        "Pairing status"
    );
    Ok(report)
}

/// Delivers extracted cookies against a pairing code
///
/// # Errors
/// `ApiError::Server` with status 400 (bad code format, no cookies) or
/// 404 (code unknown, used or expired); `ApiError::Network` on transport
/// failure.
pub async fn sync_extension(
    client: &ApiClient,
    code: &PairingCode,
    cookies: &CookieSet,
    username: Option<&str>,
) -> Result<ExtensionSyncReceipt, ApiError> {
    let body = SyncExtensionRequest {
        pairing_code: code.as_str(),
        cookies: cookies.as_slice(),
        username,
    };
    let builder = client
        .request(Method::POST, "/api/auth/sync-extension")
        .json(&body);
    let response: SyncExtensionResponse = client.send_json(builder, StatusMapping::Server).await?;

    info!(code = %code, cookies = cookies.len(), "Cookies synced via pairing code");
    Ok(ExtensionSyncReceipt {
        username: response.username,
        message: response.message,
    })
}
