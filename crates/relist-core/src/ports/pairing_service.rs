//! Pairing service port (driven/secondary port)
//!
//! Issues pairing codes for the authenticated user, reports their status,
//! and accepts cookie payloads from a secondary agent that only knows
//! the code.

use crate::domain::{
    cookie::CookieSet,
    errors::ApiError,
    newtypes::PairingCode,
    pairing::{PairingStatusReport, PairingTicket},
};

/// Acknowledgement of an extension sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSyncReceipt {
    /// Marketplace username the backend stored for the session
    pub username: Option<String>,
    pub message: Option<String>,
}

/// Port trait for the backend pairing service
#[async_trait::async_trait]
pub trait IPairingService: Send + Sync {
    /// Requests a fresh pairing code; requires an authenticated caller
    async fn request_code(&self) -> Result<PairingTicket, ApiError>;

    /// Reports the status of a code; anonymous
    async fn pairing_status(&self, code: &PairingCode) -> Result<PairingStatusReport, ApiError>;

    /// Delivers cookies for a code; anonymous, the code is the credential
    async fn sync_extension(
        &self,
        code: &PairingCode,
        cookies: &CookieSet,
        username: Option<&str>,
    ) -> Result<ExtensionSyncReceipt, ApiError>;
}
