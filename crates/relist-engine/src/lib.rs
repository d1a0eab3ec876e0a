//! Relist Engine - client-side coordination of backend work
//!
//! Provides:
//! - Progress polling for long-running backend jobs
//! - Pairing code watching
//! - Browser cookie handoff to the backend
//! - The orchestrator that ties them to user commands
//!
//! ## Modules
//!
//! - [`poller`] - Single-flight, cancellable job progress polling
//! - [`pairing`] - Pairing status watcher
//! - [`handoff`] - Login detection and cookie forwarding
//! - [`orchestrator`] - Per-target operation state machine

pub mod handoff;
pub mod orchestrator;
pub mod pairing;
pub mod poller;

#[cfg(test)]
mod testing;

pub use handoff::{
    CookieHandoffBridge, HandoffDestination, HandoffError, HandoffOutcome, LoginDetector,
    SkipReason, UrlAllowListDetector,
};
pub use orchestrator::{Orchestrator, OrchestratorError, PublishResult};
pub use pairing::{NoopPairingObserver, PairingObserver, PairingWatchHandle, PairingWatcher};
pub use poller::{PollerHandle, ProgressObserver, ProgressPoller};
