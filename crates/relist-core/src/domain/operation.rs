//! Client-side operation entity
//!
//! An [`Operation`] is one user-initiated attempt to fetch inventory from,
//! or publish a listing to, a marketplace. It tracks the lifecycle
//!
//! ```text
//! Idle → Starting → Polling → { Succeeded | Failed }
//!            │          │
//!            └──────────┴──→ Cancelled
//! ```
//!
//! One-shot operations (eBay publish) skip `Polling` and go straight
//! from `Starting` to a terminal state.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{JobId, ListingId, OperationId};

/// Third-party marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marketplace {
    Ebay,
    Poshmark,
}

impl Marketplace {
    /// Path segment used by the backend for this marketplace
    pub fn as_str(&self) -> &'static str {
        match self {
            Marketplace::Ebay => "ebay",
            Marketplace::Poshmark => "poshmark",
        }
    }

    /// Whether publishing runs as a backend job that must be polled
    pub fn publishes_as_job(&self) -> bool {
        matches!(self, Marketplace::Poshmark)
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Marketplace {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ebay" => Ok(Marketplace::Ebay),
            "poshmark" => Ok(Marketplace::Poshmark),
            other => Err(DomainError::UnknownMarketplace(other.to_string())),
        }
    }
}

/// What an operation acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "listing_id")]
pub enum OperationSubject {
    /// The whole marketplace inventory
    Inventory,
    /// A single local listing
    Listing(ListingId),
}

/// Logical target of an operation; at most one operation may be active per target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationTarget {
    pub marketplace: Marketplace,
    pub subject: OperationSubject,
}

impl OperationTarget {
    pub fn inventory(marketplace: Marketplace) -> Self {
        Self {
            marketplace,
            subject: OperationSubject::Inventory,
        }
    }

    pub fn listing(marketplace: Marketplace, listing_id: ListingId) -> Self {
        Self {
            marketplace,
            subject: OperationSubject::Listing(listing_id),
        }
    }
}

impl std::fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.subject {
            OperationSubject::Inventory => write!(f, "{}/inventory", self.marketplace),
            OperationSubject::Listing(id) => write!(f, "{}/listing/{}", self.marketplace, id),
        }
    }
}

/// Lifecycle state of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Idle,
    /// The start request is in flight
    Starting,
    /// The backend job is running and being polled
    Polling,
    Succeeded,
    /// Failed with a user-facing reason
    Failed(String),
    Cancelled,
}

impl OperationState {
    pub fn name(&self) -> &'static str {
        match self {
            OperationState::Idle => "idle",
            OperationState::Starting => "starting",
            OperationState::Polling => "polling",
            OperationState::Succeeded => "succeeded",
            OperationState::Failed(_) => "failed",
            OperationState::Cancelled => "cancelled",
        }
    }

    /// Returns true while the operation occupies its target
    pub fn is_active(&self) -> bool {
        matches!(self, OperationState::Starting | OperationState::Polling)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Succeeded | OperationState::Failed(_) | OperationState::Cancelled
        )
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationState::Failed(reason) => write!(f, "failed: {}", reason),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// One user-initiated operation against a marketplace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    id: OperationId,
    target: OperationTarget,
    state: OperationState,
    job_id: Option<JobId>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Operation {
    pub fn new(target: OperationTarget) -> Self {
        Self {
            id: OperationId::new(),
            target,
            state: OperationState::Idle,
            job_id: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn target(&self) -> &OperationTarget {
        &self.target
    }

    pub fn state(&self) -> &OperationState {
        &self.state
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Checks whether the operation may move to `target`
    pub fn can_transition_to(&self, target: &OperationState) -> bool {
        match (&self.state, target) {
            (OperationState::Idle, OperationState::Starting) => true,

            (OperationState::Starting, OperationState::Polling) => true,
            (OperationState::Starting, OperationState::Succeeded) => true,
            (OperationState::Starting, OperationState::Failed(_)) => true,
            (OperationState::Starting, OperationState::Cancelled) => true,

            (OperationState::Polling, OperationState::Succeeded) => true,
            (OperationState::Polling, OperationState::Failed(_)) => true,
            (OperationState::Polling, OperationState::Cancelled) => true,

            _ => false,
        }
    }

    /// Moves to `target`, refusing transitions the lifecycle does not allow
    pub fn transition_to(&mut self, target: OperationState) -> Result<(), DomainError> {
        if !self.can_transition_to(&target) {
            return Err(DomainError::InvalidState {
                from: self.state.name().to_string(),
                to: target.name().to_string(),
            });
        }

        if target.is_terminal() {
            self.finished_at = Some(Utc::now());
        }

        self.state = target;
        Ok(())
    }

    /// Records the backend job and moves to `Polling`
    pub fn begin_polling(&mut self, job_id: JobId) -> Result<(), DomainError> {
        self.transition_to(OperationState::Polling)?;
        self.job_id = Some(job_id);
        Ok(())
    }
}
