//! BackendProvider - port implementations over the Relist HTTP API
//!
//! Wraps the [`ApiClient`] and delegates to the jobs, pairing, and
//! marketplace modules to fulfil the [`IJobStore`], [`IPairingService`]
//! and [`IMarketplaceConnector`] port contracts.
//!
//! ## Design Notes
//!
//! - The client is immutable once built, so no lock is needed; the
//!   provider is shared behind an `Arc` by the engine.
//! - Credentials are resolved before construction (see [`crate::auth`]).

use relist_core::{
    domain::{
        cookie::CookieSet,
        errors::ApiError,
        job::JobSnapshot,
        newtypes::{ListingId, PairingCode},
        operation::Marketplace,
        pairing::{PairingStatusReport, PairingTicket},
    },
    ports::{
        ConnectReceipt, ConnectionStatus, ExtensionSyncReceipt, IJobStore, IMarketplaceConnector,
        IPairingService, JobHandle, JobRequest, PublishReceipt,
    },
};
use tracing::debug;

use crate::client::ApiClient;
use crate::{jobs, marketplace, pairing};

/// Port adapter backed by the Relist HTTP API
#[derive(Debug, Clone)]
pub struct BackendProvider {
    client: ApiClient,
}

impl BackendProvider {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IJobStore for BackendProvider {
    async fn start_job(&self, request: JobRequest) -> Result<JobHandle, ApiError> {
        debug!(?request, "BackendProvider::start_job");
        jobs::start_job(&self.client, request).await
    }

    async fn get_progress(&self, job: &JobHandle) -> Result<JobSnapshot, ApiError> {
        jobs::get_progress(&self.client, job).await
    }
}

#[async_trait::async_trait]
impl IPairingService for BackendProvider {
    async fn request_code(&self) -> Result<PairingTicket, ApiError> {
        debug!("BackendProvider::request_code");
        pairing::request_code(&self.client).await
    }

    async fn pairing_status(&self, code: &PairingCode) -> Result<PairingStatusReport, ApiError> {
        pairing::pairing_status(&self.client, code).await
    }

    async fn sync_extension(
        &self,
        code: &PairingCode,
        cookies: &CookieSet,
        username: Option<&str>,
    ) -> Result<ExtensionSyncReceipt, ApiError> {
        debug!(code = %code, cookies = cookies.len(), "BackendProvider::sync_extension");
        pairing::sync_extension(&self.client, code, cookies, username).await
    }
}

#[async_trait::async_trait]
impl IMarketplaceConnector for BackendProvider {
    async fn connect_with_cookies(&self, cookies: &CookieSet) -> Result<ConnectReceipt, ApiError> {
        debug!(cookies = cookies.len(), "BackendProvider::connect_with_cookies");
        marketplace::connect_with_cookies(&self.client, cookies).await
    }

    async fn connection_status(
        &self,
        marketplace: Marketplace,
    ) -> Result<ConnectionStatus, ApiError> {
        marketplace::connection_status(&self.client, marketplace).await
    }

    async fn disconnect(&self, marketplace: Marketplace) -> Result<(), ApiError> {
        debug!(%marketplace, "BackendProvider::disconnect");
        marketplace::disconnect(&self.client, marketplace).await
    }

    async fn publish_ebay(&self, listing_id: ListingId) -> Result<PublishReceipt, ApiError> {
        debug!(%listing_id, "BackendProvider::publish_ebay");
        marketplace::publish_ebay(&self.client, listing_id).await
    }
}
