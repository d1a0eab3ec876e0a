//! Marketplace connector port (driven/secondary port)
//!
//! Everything about a marketplace account that is not a long-running
//! job: connecting a session from cookies, reading and dropping the
//! connection, and the synchronous eBay publish.

use serde::{Deserialize, Serialize};

use crate::domain::{
    cookie::CookieSet, errors::ApiError, newtypes::ListingId, operation::Marketplace,
};

/// Whether the user has a live session for a marketplace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub marketplace: Marketplace,
    pub connected: bool,
    #[serde(default)]
    pub username: Option<String>,
}

/// Acknowledgement of a direct cookie connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReceipt {
    pub username: Option<String>,
}

/// Result of a synchronous publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Marketplace-side listing id
    pub external_id: Option<String>,
    /// Public listing URL
    pub url: Option<String>,
    pub message: Option<String>,
}

/// Port trait for marketplace account operations
#[async_trait::async_trait]
pub trait IMarketplaceConnector: Send + Sync {
    /// Materializes a Poshmark session from cookies for the authenticated user
    async fn connect_with_cookies(&self, cookies: &CookieSet) -> Result<ConnectReceipt, ApiError>;

    /// Reads the connection state for `marketplace`
    async fn connection_status(
        &self,
        marketplace: Marketplace,
    ) -> Result<ConnectionStatus, ApiError>;

    /// Drops the stored session for `marketplace`
    async fn disconnect(&self, marketplace: Marketplace) -> Result<(), ApiError>;

    /// Publishes a listing to eBay in a single request (no job)
    async fn publish_ebay(&self, listing_id: ListingId) -> Result<PublishReceipt, ApiError>;
}
