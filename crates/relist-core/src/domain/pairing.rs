//! Pairing session domain types
//!
//! A pairing code links a secondary authentication event (a browser
//! extension or in-app browser delivering marketplace cookies) to the
//! already-authenticated primary session. The backend issues codes and
//! tracks their consumption; the client only displays a code and polls
//! its status.
//!
//! [`PairingSession`] is the client-observed state machine:
//!
//! ```text
//! AwaitingCode ──show_code──→ ShowingCode ──observe──→ Fulfilled
//!                                  │
//!                                  └──────observe──→ Expired
//! ```
//!
//! Both `Fulfilled` and `Expired` are terminal; the only way forward is
//! a brand-new session with a brand-new code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::PairingCode;

/// Lifetime the backend gives every pairing code
pub const PAIRING_CODE_TTL_SECS: u64 = 600;

/// Response to a pairing-code request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingTicket {
    pub code: PairingCode,
    #[serde(default = "default_ttl")]
    pub expires_in_seconds: u64,
    #[serde(
        default,
        deserialize_with = "crate::domain::job::lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_ttl() -> u64 {
    PAIRING_CODE_TTL_SECS
}

/// Backend status of a pairing code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStatus {
    Pending,
    Success,
    Expired,
    NotFound,
}

impl std::fmt::Display for PairingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairingStatus::Pending => write!(f, "pending"),
            PairingStatus::Success => write!(f, "success"),
            PairingStatus::Expired => write!(f, "expired"),
            PairingStatus::NotFound => write!(f, "not_found"),
        }
    }
}

/// Body of a pairing-status response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingStatusReport {
    pub status: PairingStatus,
    #[serde(default)]
    pub cookies_received: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PairingStatusReport {
    pub fn new(status: PairingStatus, cookies_received: bool) -> Self {
        Self {
            status,
            cookies_received,
            message: None,
        }
    }
}

/// Where a pairing session currently stands, as seen by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingPhase {
    /// No code has been issued yet
    AwaitingCode,
    /// A code is on screen and its status is being polled
    ShowingCode {
        code: PairingCode,
        expires_in_seconds: u64,
    },
    /// Cookies arrived for the code; the marketplace is connected
    Fulfilled { code: PairingCode },
    /// The code expired or the backend no longer knows it
    Expired { code: PairingCode },
}

impl PairingPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PairingPhase::Fulfilled { .. } | PairingPhase::Expired { .. }
        )
    }

    fn name(&self) -> &'static str {
        match self {
            PairingPhase::AwaitingCode => "awaiting_code",
            PairingPhase::ShowingCode { .. } => "showing_code",
            PairingPhase::Fulfilled { .. } => "fulfilled",
            PairingPhase::Expired { .. } => "expired",
        }
    }
}

impl std::fmt::Display for PairingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of feeding one status report into a [`PairingSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingTransition {
    /// Still waiting
    Unchanged,
    /// Moved to `Fulfilled`
    Fulfilled,
    /// Moved to `Expired`
    Expired,
}

/// Client-side pairing state machine for a single code
#[derive(Debug, Clone)]
pub struct PairingSession {
    phase: PairingPhase,
    cookies_seen: bool,
    polls: u32,
}

impl Default for PairingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PairingSession {
    pub fn new() -> Self {
        Self {
            phase: PairingPhase::AwaitingCode,
            cookies_seen: false,
            polls: 0,
        }
    }

    pub fn phase(&self) -> &PairingPhase {
        &self.phase
    }

    /// The code being shown, if one has been issued
    pub fn code(&self) -> Option<&PairingCode> {
        match &self.phase {
            PairingPhase::AwaitingCode => None,
            PairingPhase::ShowingCode { code, .. }
            | PairingPhase::Fulfilled { code }
            | PairingPhase::Expired { code } => Some(code),
        }
    }

    /// Whether any report so far had `cookies_received == true`
    pub fn cookies_seen(&self) -> bool {
        self.cookies_seen
    }

    /// Number of status reports observed
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Records the code issued by the backend
    pub fn show_code(&mut self, ticket: &PairingTicket) -> Result<(), DomainError> {
        if self.phase != PairingPhase::AwaitingCode {
            return Err(DomainError::InvalidState {
                from: self.phase.to_string(),
                to: "showing_code".to_string(),
            });
        }
        self.phase = PairingPhase::ShowingCode {
            code: ticket.code.clone(),
            expires_in_seconds: ticket.expires_in_seconds,
        };
        Ok(())
    }

    /// Feeds one status report into the state machine
    ///
    /// # Errors
    /// - `InvalidState` if no code is being shown (not issued yet, or
    ///   already terminal)
    /// - `InvalidState` if the backend reports `not_found` for a code it
    ///   previously reported as having received cookies; the session
    ///   stays where it is
    pub fn observe(
        &mut self,
        report: &PairingStatusReport,
    ) -> Result<PairingTransition, DomainError> {
        let code = match &self.phase {
            PairingPhase::ShowingCode { code, .. } => code.clone(),
            other => {
                return Err(DomainError::InvalidState {
                    from: other.to_string(),
                    to: report.status.to_string(),
                })
            }
        };

        self.polls += 1;

        if report.status == PairingStatus::NotFound && self.cookies_seen {
            return Err(DomainError::InvalidState {
                from: "cookies_received".to_string(),
                to: PairingStatus::NotFound.to_string(),
            });
        }

        if report.cookies_received {
            self.cookies_seen = true;
        }

        match report.status {
            PairingStatus::Success if report.cookies_received => {
                self.phase = PairingPhase::Fulfilled { code };
                Ok(PairingTransition::Fulfilled)
            }
            PairingStatus::Expired | PairingStatus::NotFound => {
                self.phase = PairingPhase::Expired { code };
                Ok(PairingTransition::Expired)
            }
            _ => Ok(PairingTransition::Unchanged),
        }
    }
}
