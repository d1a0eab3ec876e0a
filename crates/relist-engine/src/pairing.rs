//! Pairing watcher - polls the status of one pairing code
//!
//! A dedicated task (separate from the job poller) that feeds
//! [`PairingStatusReport`]s into a [`PairingSession`] every few seconds
//! and stops when the session reaches a terminal phase.
//!
//! The server is the only authority on expiry; the watcher does no
//! wall-clock arithmetic on `expires_at`.

use std::{sync::Arc, time::Duration};

use relist_core::{
    domain::{
        errors::DomainError,
        newtypes::PairingCode,
        pairing::{PairingPhase, PairingSession, PairingStatusReport, PairingTicket, PairingTransition},
    },
    ports::IPairingService,
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default interval between pairing status queries
pub const DEFAULT_PAIRING_INTERVAL: Duration = Duration::from_secs(3);

/// Receives pairing progress for one code
pub trait PairingObserver: Send + Sync {
    /// Every successfully fetched report, before it is applied
    fn on_status(&self, _report: &PairingStatusReport) {}

    /// Cookies arrived for the code; called at most once
    fn on_fulfilled(&self, code: &PairingCode);

    /// The code expired or is unknown; called at most once
    fn on_expired(&self, code: &PairingCode);
}

/// Observer that ignores every event
pub struct NoopPairingObserver;

impl PairingObserver for NoopPairingObserver {
    fn on_fulfilled(&self, _code: &PairingCode) {}
    fn on_expired(&self, _code: &PairingCode) {}
}

// ============================================================================
// PairingWatchHandle
// ============================================================================

/// Handle to a running pairing watcher
#[derive(Debug)]
pub struct PairingWatchHandle {
    code: PairingCode,
    token: CancellationToken,
    phase: watch::Receiver<PairingPhase>,
    task: JoinHandle<()>,
}

impl PairingWatchHandle {
    pub fn code(&self) -> &PairingCode {
        &self.code
    }

    /// Current client-side phase of the pairing
    pub fn phase(&self) -> PairingPhase {
        self.phase.borrow().clone()
    }

    /// Subscribes to phase changes
    pub fn subscribe(&self) -> watch::Receiver<PairingPhase> {
        self.phase.clone()
    }

    /// Stops watching; idempotent, no callback fires afterwards
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(code = %self.code, "Cancelling pairing watcher");
            self.token.cancel();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the watcher task to exit
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(code = %self.code, error = %e, "Pairing watcher task failed");
        }
    }
}

// ============================================================================
// PairingWatcher
// ============================================================================

/// Spawns pairing status watchers
#[derive(Debug, Clone)]
pub struct PairingWatcher {
    interval: Duration,
}

impl Default for PairingWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_PAIRING_INTERVAL)
    }
}

impl PairingWatcher {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Starts watching the code in `ticket`
    ///
    /// # Errors
    /// Never in practice; the session is fresh. Kept so a misuse of the
    /// session API surfaces instead of being hidden.
    pub fn watch(
        &self,
        service: Arc<dyn IPairingService>,
        ticket: &PairingTicket,
        observer: Arc<dyn PairingObserver>,
    ) -> Result<PairingWatchHandle, DomainError> {
        let mut session = PairingSession::new();
        session.show_code(ticket)?;

        let (phase_tx, phase_rx) = watch::channel(session.phase().clone());
        let token = CancellationToken::new();
        info!(
            code = %ticket.code,
            expires_in = ticket.expires_in_seconds,
            "Watching pairing code"
        );

        let task = tokio::spawn(watch_loop(
            service,
            session,
            observer,
            phase_tx,
            self.interval,
            token.clone(),
        ));

        Ok(PairingWatchHandle {
            code: ticket.code.clone(),
            token,
            phase: phase_rx,
            task,
        })
    }
}

async fn watch_loop(
    service: Arc<dyn IPairingService>,
    mut session: PairingSession,
    observer: Arc<dyn PairingObserver>,
    phase_tx: watch::Sender<PairingPhase>,
    interval: Duration,
    token: CancellationToken,
) {
    let code = match session.code() {
        Some(code) => code.clone(),
        None => return,
    };
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = service.pairing_status(&code) => result,
        };

        if token.is_cancelled() {
            break;
        }

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                warn!(code = %code, kind = %e.kind(), error = %e, "Pairing status query failed");
                continue;
            }
        };
        observer.on_status(&report);

        match session.observe(&report) {
            Ok(PairingTransition::Unchanged) => {
                debug!(code = %code, polls = session.polls(), status = %report.status, "Pairing pending");
            }
            Ok(PairingTransition::Fulfilled) => {
                info!(code = %code, polls = session.polls(), "Pairing fulfilled");
                phase_tx.send_replace(session.phase().clone());
                observer.on_fulfilled(&code);
                break;
            }
            Ok(PairingTransition::Expired) => {
                info!(code = %code, status = %report.status, "Pairing code expired");
                phase_tx.send_replace(session.phase().clone());
                observer.on_expired(&code);
                break;
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Backend reported not_found after cookies were received");
            }
        }
    }

    debug!(code = %code, "Pairing watcher stopped");
}
