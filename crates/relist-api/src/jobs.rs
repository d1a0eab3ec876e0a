//! Job store endpoints
//!
//! Starting inventory fetches and Poshmark publishes, and reading their
//! progress. Each job kind has its own progress endpoint; the
//! [`JobHandle`] carries the kind so callers never pick the wrong one.

use relist_core::{
    domain::{
        errors::ApiError,
        job::{JobKind, JobSnapshot},
        newtypes::JobId,
    },
    ports::{JobHandle, JobRequest},
};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{decode, ApiClient, StatusMapping};

/// Body of a job-start response
#[derive(Debug, Deserialize)]
struct StartJobResponse {
    /// Some backends emit numeric ids
    job_id: Option<serde_json::Value>,
}

fn start_path(request: &JobRequest) -> String {
    match request {
        JobRequest::InventoryFetch => "/marketplaces/poshmark/inventory".to_string(),
        JobRequest::Publish { listing_id } => {
            format!("/marketplaces/poshmark/{}/publish", listing_id)
        }
    }
}

fn progress_path(job: &JobHandle) -> String {
    match job.kind {
        JobKind::InventoryFetch => {
            format!("/marketplaces/poshmark/inventory-progress/{}", job.id)
        }
        JobKind::Publish => format!("/publish-progress/{}", job.id),
    }
}

/// Extracts a usable job id from a start response body
fn parse_job_id(body: &str) -> Result<JobId, ApiError> {
    let response: StartJobResponse = decode(body)?;
    let raw = match response.job_id {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(ApiError::protocol_with_body("response lacks job_id", body)),
    };
    JobId::new(raw).map_err(|e| ApiError::protocol_with_body(e.to_string(), body))
}

/// Starts a job on the backend
///
/// # Returns
/// A [`JobHandle`] for polling the job's progress
///
/// # Errors
/// `ApiError::Auth` without a token, `ApiError::Network` on transport
/// failure, `ApiError::Protocol` when the body lacks `job_id`, and
/// `ApiError::Server` for any other rejection.
pub async fn start_job(client: &ApiClient, request: JobRequest) -> Result<JobHandle, ApiError> {
    let path = start_path(&request);
    debug!(path = %path, "Starting job");

    let builder = client.authed(Method::POST, &path)?;
    let body = client.send(builder, StatusMapping::Server).await?;
    let id = parse_job_id(&body)?;
    let handle = JobHandle::new(id, request.kind());

    info!(job_id = %handle.id, kind = %handle.kind, "Job started");
    Ok(handle)
}

/// Reads the current state of a job
///
/// Any non-success status other than 401/403 is a protocol error carrying
/// the raw body: the job store has no other legitimate failure mode.
pub async fn get_progress(client: &ApiClient, job: &JobHandle) -> Result<JobSnapshot, ApiError> {
    let path = progress_path(job);
    let builder = client.authed(Method::GET, &path)?;
    let snapshot: JobSnapshot = client.send_json(builder, StatusMapping::Protocol).await?;

    debug!(
        job_id = %job.id,
        status = %snapshot.status,
        messages = snapshot.messages.len(),
        "Job progress"
    );
    Ok(snapshot)
}
