//! Domain entities and business logic
//!
//! This module contains the core domain types for Relist:
//! - Newtypes for type-safe identifiers and validated domain types
//! - Jobs and their progress logs
//! - Pairing sessions and their client-side state machine
//! - Browser cookies carried by the session handoff
//! - Operations (one publish/fetch attempt against a marketplace)
//! - Domain-specific error types

pub mod cookie;
pub mod errors;
pub mod job;
pub mod newtypes;
pub mod operation;
pub mod pairing;

// Re-export commonly used types
pub use cookie::{Cookie, CookieSet};
pub use errors::{ApiError, ApiErrorKind, DomainError};
pub use job::{Job, JobKind, JobOutcome, JobSnapshot, JobStatus, ProgressLevel, ProgressMessage};
pub use newtypes::*;
pub use operation::{Marketplace, Operation, OperationState, OperationSubject, OperationTarget};
pub use pairing::{
    PairingPhase, PairingSession, PairingStatus, PairingStatusReport, PairingTicket,
    PairingTransition,
};
