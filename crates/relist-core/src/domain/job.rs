//! Job domain entity
//!
//! A job is a backend-tracked asynchronous task (inventory fetch, publish)
//! with an append-only progress log and a terminal status. The client
//! only ever observes jobs through [`JobSnapshot`]s returned by the
//! progress endpoint; [`Job`] folds those snapshots into a local record
//! that refuses to move once a terminal status has been seen.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::errors::DomainError;
use super::newtypes::JobId;

/// Message shown when a job fails without reporting any progress
pub const GENERIC_FAILURE_MESSAGE: &str = "The operation failed. Please try again.";

/// Message shown when a job completes without reporting any progress
pub const GENERIC_SUCCESS_MESSAGE: &str = "Operation completed.";

/// Kind of long-running job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Fetch the marketplace closet into local inventory
    InventoryFetch,
    /// Publish a listing to the marketplace
    Publish,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::InventoryFetch => write!(f, "inventory_fetch"),
            JobKind::Publish => write!(f, "publish"),
        }
    }
}

/// Status of a job as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Still running
    #[serde(alias = "running", alias = "processing", alias = "in_progress")]
    Pending,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    /// Returns true once no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Severity of a progress message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressLevel {
    #[default]
    Info,
    Success,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

/// One entry in a job's progress log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressMessage {
    #[serde(default)]
    pub level: ProgressLevel,
    pub message: String,
    /// When the backend recorded the message
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ProgressMessage {
    pub fn new(level: ProgressLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ProgressLevel::Info, message)
    }
}

/// Accepts RFC 3339 timestamps as well as the naive ISO-8601 form the
/// backend emits (`2024-05-01T12:00:00.123456`, implicitly UTC).
/// Anything unparseable becomes `None` rather than failing the snapshot.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

// ============================================================================
// JobSnapshot
// ============================================================================

/// Body of a progress response: the backend's current view of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub messages: Vec<ProgressMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_message: Option<ProgressMessage>,
}

impl JobSnapshot {
    /// Returns the most recent progress message
    ///
    /// Uses the backend's `latest_message` when present, otherwise the
    /// last element of `messages`.
    pub fn latest(&self) -> Option<&ProgressMessage> {
        self.latest_message.as_ref().or_else(|| self.messages.last())
    }

    /// Returns the result payload, which only exists for completed jobs
    pub fn result(&self) -> Option<&serde_json::Value> {
        match self.status {
            JobStatus::Completed => self.result.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// JobOutcome
// ============================================================================

/// Terminal result of a job, handed to whoever started it
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The job completed; `result` is the backend payload, if any
    Completed {
        result: Option<serde_json::Value>,
        messages: Vec<ProgressMessage>,
    },
    /// The job failed; `reason` is the user-facing explanation
    Failed {
        reason: String,
        messages: Vec<ProgressMessage>,
    },
}

impl JobOutcome {
    /// Builds the outcome for a terminal snapshot, or `None` if still pending
    pub fn from_snapshot(snapshot: JobSnapshot) -> Option<Self> {
        match snapshot.status {
            JobStatus::Pending => None,
            JobStatus::Completed => Some(JobOutcome::Completed {
                result: snapshot.result,
                messages: snapshot.messages,
            }),
            JobStatus::Failed => {
                let reason = snapshot
                    .latest()
                    .map(|m| m.message.clone())
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                Some(JobOutcome::Failed {
                    reason,
                    messages: snapshot.messages,
                })
            }
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed { .. } => JobStatus::Completed,
            JobOutcome::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    pub fn messages(&self) -> &[ProgressMessage] {
        match self {
            JobOutcome::Completed { messages, .. } | JobOutcome::Failed { messages, .. } => {
                messages
            }
        }
    }

    /// Single human-readable line describing the outcome
    pub fn summary(&self) -> String {
        match self {
            JobOutcome::Completed { messages, .. } => messages
                .last()
                .map(|m| m.message.clone())
                .unwrap_or_else(|| GENERIC_SUCCESS_MESSAGE.to_string()),
            JobOutcome::Failed { reason, .. } => reason.clone(),
        }
    }
}

// ============================================================================
// Job
// ============================================================================

/// Local record of a job, built from successive snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    id: JobId,
    kind: JobKind,
    status: JobStatus,
    messages: Vec<ProgressMessage>,
    result: Option<serde_json::Value>,
    started_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, kind: JobKind) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Pending,
            messages: Vec::new(),
            result: None,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn messages(&self) -> &[ProgressMessage] {
        &self.messages
    }

    pub fn latest_message(&self) -> Option<&ProgressMessage> {
        self.messages.last()
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Folds a fresh snapshot into this record
    ///
    /// The message list is replaced wholesale: the backend is
    /// authoritative and may consolidate entries. Once terminal, the
    /// record is frozen; a repeat of the same terminal status is ignored
    /// and any other status is rejected.
    ///
    /// Returns `Ok(true)` if the record changed.
    pub fn apply(&mut self, snapshot: &JobSnapshot) -> Result<bool, DomainError> {
        if self.status.is_terminal() {
            if snapshot.status == self.status {
                return Ok(false);
            }
            return Err(DomainError::InvalidState {
                from: self.status.to_string(),
                to: snapshot.status.to_string(),
            });
        }

        let changed = self.status != snapshot.status || self.messages != snapshot.messages;
        self.status = snapshot.status;
        self.messages = snapshot.messages.clone();
        if snapshot.status == JobStatus::Completed {
            self.result = snapshot.result.clone();
        }
        Ok(changed)
    }
}
