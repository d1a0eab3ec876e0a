//! Credential storage for the Relist backend
//!
//! The backend issues a bearer token at login; the client keeps it in the
//! OS credential store and hands it to [`ApiClient`](crate::client::ApiClient).
//!
//! ## Components
//!
//! - [`StoredToken`] - The persisted credential plus when it was saved
//! - [`KeyringTokenStorage`] - Secure token storage using the system keyring

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "relist";

// ============================================================================
// StoredToken
// ============================================================================

/// A bearer token as persisted in the keyring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub stored_at: DateTime<Utc>,
}

impl StoredToken {
    /// Wraps a raw token, trimming surrounding whitespace
    ///
    /// # Errors
    /// Fails when the token is empty after trimming
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            anyhow::bail!("Access token must not be empty");
        }
        Ok(Self {
            access_token,
            stored_at: Utc::now(),
        })
    }
}

// ============================================================================
// KeyringTokenStorage
// ============================================================================

/// Stores and retrieves the backend token from the system keyring
///
/// Uses the `keyring` crate to store tokens securely in the OS credential
/// store (e.g., GNOME Keyring, KDE Wallet, macOS Keychain).
/// Tokens are serialized as JSON with the service name "relist" and the
/// configured account as the username.
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    /// Stores a token in the system keyring for the given account
    ///
    /// # Arguments
    /// * `account` - Account name (used as keyring username)
    /// * `token` - The token to store
    pub fn store(account: &str, token: &StoredToken) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account)
            .context("Failed to create keyring entry")?;

        let json = serde_json::to_string(token).context("Failed to serialize token")?;

        entry
            .set_password(&json)
            .context("Failed to store token in keyring")?;

        debug!(account, "Stored token in keyring");
        Ok(())
    }

    /// Loads the token for the given account
    ///
    /// # Returns
    /// `Some(StoredToken)` if found and valid, `None` if not found
    pub fn load(account: &str) -> Result<Option<StoredToken>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(json) => {
                let token: StoredToken = serde_json::from_str(&json)
                    .context("Failed to deserialize token from keyring")?;
                debug!(account, "Loaded token from keyring");
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account, "No token found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes the token for the given account; missing entries are not an error
    pub fn clear(account: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account)
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!(account, "Cleared token from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account, "No token to clear");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}
