//! Job store port (driven/secondary port)
//!
//! The backend is the authoritative store for long-running jobs. This
//! port exposes the two operations the client needs: starting a job and
//! reading its current progress.
//!
//! ## Design Notes
//!
//! - Returns [`ApiError`] rather than `anyhow::Error`: pollers need to
//!   tell transient network failures from protocol and auth failures.
//! - Implementations are stateless between calls.

use serde::{Deserialize, Serialize};

use crate::domain::{
    errors::ApiError,
    job::{JobKind, JobSnapshot},
    newtypes::{JobId, ListingId},
};

/// What to start on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum JobRequest {
    /// Fetch the marketplace inventory
    InventoryFetch,
    /// Publish one listing
    Publish { listing_id: ListingId },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::InventoryFetch => JobKind::InventoryFetch,
            JobRequest::Publish { .. } => JobKind::Publish,
        }
    }
}

/// A started job: its id plus the kind, which selects the progress endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: JobId,
    pub kind: JobKind,
}

impl JobHandle {
    pub fn new(id: JobId, kind: JobKind) -> Self {
        Self { id, kind }
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Port trait for the backend job store
#[async_trait::async_trait]
pub trait IJobStore: Send + Sync {
    /// Starts a job on the backend
    ///
    /// # Errors
    /// - `ApiError::Auth` when no valid credential is present
    /// - `ApiError::Network` on transport failure
    /// - `ApiError::Protocol` when a success response lacks `job_id`
    async fn start_job(&self, request: JobRequest) -> Result<JobHandle, ApiError>;

    /// Reads the current state of a job
    ///
    /// # Errors
    /// As for [`start_job`](IJobStore::start_job); additionally any
    /// non-success status is reported as `ApiError::Protocol` carrying the
    /// raw response body.
    async fn get_progress(&self, job: &JobHandle) -> Result<JobSnapshot, ApiError>;
}
