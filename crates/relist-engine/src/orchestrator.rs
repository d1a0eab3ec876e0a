//! Client orchestrator - owns every running operation
//!
//! The orchestrator starts backend jobs, hands them to the
//! [`ProgressPoller`], and keeps one [`Operation`] per target in an
//! owned registry. It also owns the pairing lifecycle (at most one
//! watcher at a time) and a cache of marketplace connection status.
//!
//! ## Operation lifecycle
//!
//! ```text
//! idle ──→ starting ──→ polling ──→ succeeded | failed
//!              │            │
//!              └────────────┴──→ cancelled
//! ```
//!
//! A target already `starting` or `polling` rejects new starts with
//! [`OrchestratorError::AlreadyRunning`]. Finished operations stay in the
//! registry until the next start for the same target replaces them.
//! A synchronous eBay publish cannot be cancelled once its request is
//! out; the listing may already be live when the response arrives.
//!
//! Registry entries are never borrowed across an `.await`; every write
//! after an await re-checks the operation id so a stale task cannot
//! touch its successor.

use std::sync::{Arc, Mutex as StdMutex};

use dashmap::{mapref::entry::Entry, DashMap};
use relist_core::{
    config::PollingConfig,
    domain::{
        errors::{ApiError, DomainError},
        job::{JobOutcome, JobStatus, ProgressMessage},
        newtypes::{ListingId, OperationId, PairingCode},
        operation::{Marketplace, Operation, OperationState, OperationTarget},
        pairing::{PairingPhase, PairingStatusReport, PairingTicket},
    },
    ports::{
        ConnectionStatus, IJobStore, IMarketplaceConnector, IPairingService, JobRequest,
        PublishReceipt,
    },
};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::{
    pairing::{PairingObserver, PairingWatchHandle, PairingWatcher},
    poller::{PollerHandle, ProgressObserver, ProgressPoller},
};

/// Errors surfaced by orchestrator commands
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// An operation is already starting or polling for this target
    #[error("An operation is already running for {0}")]
    AlreadyRunning(OperationTarget),

    /// The operation was cancelled before its start request returned
    #[error("Operation for {0} was cancelled")]
    Cancelled(OperationTarget),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// What `publish` started
#[derive(Debug, Clone)]
pub enum PublishResult {
    /// A backend job is being polled; progress goes to the observer
    Started(OperationId),
    /// The marketplace published synchronously
    Published {
        operation: OperationId,
        receipt: PublishReceipt,
    },
}

struct ActiveEntry {
    operation: Operation,
    poller: Option<PollerHandle>,
    gate: Arc<DeliveryGate>,
    one_shot: bool,
}

/// Blocks observer delivery once its operation is cancelled
///
/// `close` waits for a delivery already in progress, so nothing reaches
/// the observer after it returns.
#[derive(Default)]
struct DeliveryGate {
    closed: StdMutex<bool>,
}

impl DeliveryGate {
    fn deliver(&self, f: impl FnOnce()) {
        let closed = self.closed.lock().unwrap_or_else(|e| e.into_inner());
        if !*closed {
            f();
        }
    }

    fn close(&self) {
        *self.closed.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }
}

impl ActiveEntry {
    fn new(operation: Operation, one_shot: bool) -> Self {
        Self {
            operation,
            poller: None,
            gate: Arc::new(DeliveryGate::default()),
            one_shot,
        }
    }
}

type Registry = Arc<DashMap<OperationTarget, ActiveEntry>>;

// ============================================================================
// Orchestrator
// ============================================================================

/// Coordinates jobs, pollers, pairing and connection status
pub struct Orchestrator {
    jobs: Arc<dyn IJobStore>,
    pairing: Arc<dyn IPairingService>,
    marketplace: Arc<dyn IMarketplaceConnector>,
    poller: ProgressPoller,
    watcher: PairingWatcher,
    registry: Registry,
    pairing_watch: Mutex<Option<PairingWatchHandle>>,
    connections: Arc<DashMap<Marketplace, ConnectionStatus>>,
}

impl Orchestrator {
    /// Creates an orchestrator with the default polling intervals
    pub fn new(
        jobs: Arc<dyn IJobStore>,
        pairing: Arc<dyn IPairingService>,
        marketplace: Arc<dyn IMarketplaceConnector>,
    ) -> Self {
        Self {
            jobs,
            pairing,
            marketplace,
            poller: ProgressPoller::default(),
            watcher: PairingWatcher::default(),
            registry: Arc::new(DashMap::new()),
            pairing_watch: Mutex::new(None),
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Uses the intervals from the `polling` config section
    pub fn with_polling(mut self, polling: &PollingConfig) -> Self {
        self.poller = ProgressPoller::new(polling.job_interval());
        self.watcher = PairingWatcher::new(polling.pairing_interval());
        self
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Starts a Poshmark inventory fetch
    ///
    /// # Errors
    /// `AlreadyRunning` when a fetch is active, `Api` when the start
    /// request fails, `Cancelled` when `cancel` won the race with it.
    pub async fn start_inventory_fetch(
        &self,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<OperationId, OrchestratorError> {
        let target = OperationTarget::inventory(Marketplace::Poshmark);
        self.start_job(target, JobRequest::InventoryFetch, observer)
            .await
    }

    /// Publishes a listing to `marketplace`
    ///
    /// Poshmark publishes run as a polled job; eBay answers in one call
    /// and never reaches `polling`. The observer only receives events
    /// for job-based publishes.
    pub async fn publish(
        &self,
        marketplace: Marketplace,
        listing_id: ListingId,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<PublishResult, OrchestratorError> {
        let target = OperationTarget::listing(marketplace, listing_id);

        if marketplace.publishes_as_job() {
            let id = self
                .start_job(target, JobRequest::Publish { listing_id }, observer)
                .await?;
            return Ok(PublishResult::Started(id));
        }

        let id = self.reserve(target, true)?;
        let result = self.marketplace.publish_ebay(listing_id).await;

        let Some(mut entry) = self.registry.get_mut(&target) else {
            return Err(OrchestratorError::Cancelled(target));
        };
        if entry.operation.id() != id || *entry.operation.state() != OperationState::Starting {
            return Err(OrchestratorError::Cancelled(target));
        }

        match result {
            Ok(receipt) => {
                entry.operation.transition_to(OperationState::Succeeded)?;
                info!(target = %target, external_id = ?receipt.external_id, "Listing published");
                Ok(PublishResult::Published {
                    operation: id,
                    receipt,
                })
            }
            Err(e) => {
                entry
                    .operation
                    .transition_to(OperationState::Failed(e.message()))?;
                warn!(target = %target, error = %e, "Publish failed");
                Err(e.into())
            }
        }
    }

    /// Cancels the active operation for `target`
    ///
    /// Returns true if something was cancelled; calling it on an idle or
    /// finished target is a no-op, as is cancelling an eBay publish whose
    /// request is already out.
    pub fn cancel(&self, target: &OperationTarget) -> bool {
        let Some(mut entry) = self.registry.get_mut(target) else {
            return false;
        };
        if !entry.operation.state().is_active() {
            return false;
        }
        if entry.one_shot {
            info!(target = %target, "Publish request already sent; not cancelling");
            return false;
        }

        if let Some(poller) = entry.poller.take() {
            poller.cancel();
        }
        entry.gate.close();
        match entry.operation.transition_to(OperationState::Cancelled) {
            Ok(()) => {
                info!(target = %target, operation = %entry.operation.id(), "Operation cancelled");
                true
            }
            Err(e) => {
                warn!(target = %target, error = %e, "Could not cancel operation");
                false
            }
        }
    }

    /// Current state for `target`, or `None` if nothing ever ran there
    pub fn state(&self, target: &OperationTarget) -> Option<OperationState> {
        self.registry
            .get(target)
            .map(|entry| entry.operation.state().clone())
    }

    /// Snapshot of the latest operation for `target`
    pub fn operation(&self, target: &OperationTarget) -> Option<Operation> {
        self.registry.get(target).map(|entry| entry.operation.clone())
    }

    /// Operations currently starting or polling
    pub fn active_operations(&self) -> Vec<Operation> {
        self.registry
            .iter()
            .filter(|entry| entry.operation.state().is_active())
            .map(|entry| entry.operation.clone())
            .collect()
    }

    /// Claims `target` for a new operation in `starting`
    fn reserve(
        &self,
        target: OperationTarget,
        one_shot: bool,
    ) -> Result<OperationId, OrchestratorError> {
        let mut operation = Operation::new(target);
        operation.transition_to(OperationState::Starting)?;
        let id = operation.id();

        match self.registry.entry(target) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().operation.state().is_active() {
                    debug!(target = %target, "Rejecting start, target busy");
                    return Err(OrchestratorError::AlreadyRunning(target));
                }
                occupied.insert(ActiveEntry::new(operation, one_shot));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ActiveEntry::new(operation, one_shot));
            }
        }

        info!(target = %target, operation = %id, "Operation starting");
        Ok(id)
    }

    async fn start_job(
        &self,
        target: OperationTarget,
        request: JobRequest,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<OperationId, OrchestratorError> {
        let id = self.reserve(target, false)?;
        let result = self.jobs.start_job(request).await;

        let Some(mut entry) = self.registry.get_mut(&target) else {
            return Err(OrchestratorError::Cancelled(target));
        };
        if entry.operation.id() != id || *entry.operation.state() != OperationState::Starting {
            if let Ok(job) = &result {
                info!(target = %target, job = %job, "Job started after cancellation; not polling");
            }
            return Err(OrchestratorError::Cancelled(target));
        }

        let job = match result {
            Ok(job) => job,
            Err(e) => {
                entry
                    .operation
                    .transition_to(OperationState::Failed(e.message()))?;
                warn!(target = %target, kind = %e.kind(), error = %e, "Could not start job");
                return Err(e.into());
            }
        };

        entry.operation.begin_polling(job.id.clone())?;
        let tracker = Arc::new(TrackingObserver {
            registry: Arc::clone(&self.registry),
            target,
            operation: id,
            gate: Arc::clone(&entry.gate),
            inner: observer,
        });
        entry.poller = Some(self.poller.start(Arc::clone(&self.jobs), job, tracker));
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Pairing
    // ------------------------------------------------------------------

    /// Requests a fresh pairing code and starts watching it
    ///
    /// Any previous watcher is cancelled first; its code is abandoned.
    /// On fulfilment the Poshmark connection status is refreshed before
    /// `observer` hears about it.
    pub async fn begin_pairing(
        &self,
        observer: Arc<dyn PairingObserver>,
    ) -> Result<PairingTicket, OrchestratorError> {
        let mut slot = self.pairing_watch.lock().await;
        if let Some(previous) = slot.take() {
            previous.cancel();
        }

        let ticket = self.pairing.request_code().await?;
        let refreshing = Arc::new(RefreshingPairingObserver {
            marketplace: Arc::clone(&self.marketplace),
            connections: Arc::clone(&self.connections),
            inner: observer,
        });
        let handle = self
            .watcher
            .watch(Arc::clone(&self.pairing), &ticket, refreshing)?;
        *slot = Some(handle);

        Ok(ticket)
    }

    /// Stops the pairing watcher; returns true if one was running
    pub async fn cancel_pairing(&self) -> bool {
        match self.pairing_watch.lock().await.take() {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.cancel();
                running
            }
            None => false,
        }
    }

    /// Phase of the current pairing, if one was started
    pub async fn pairing_phase(&self) -> Option<PairingPhase> {
        self.pairing_watch.lock().await.as_ref().map(|h| h.phase())
    }

    /// Subscribes to phase changes of the current pairing
    pub async fn subscribe_pairing(&self) -> Option<watch::Receiver<PairingPhase>> {
        self.pairing_watch
            .lock()
            .await
            .as_ref()
            .map(|h| h.subscribe())
    }

    // ------------------------------------------------------------------
    // Connection status
    // ------------------------------------------------------------------

    /// Last known connection status for `marketplace`
    pub fn connection_status(&self, marketplace: Marketplace) -> Option<ConnectionStatus> {
        self.connections.get(&marketplace).map(|s| s.clone())
    }

    /// Queries the backend and updates the cache
    pub async fn refresh_connection(
        &self,
        marketplace: Marketplace,
    ) -> Result<ConnectionStatus, OrchestratorError> {
        let status = refresh(&*self.marketplace, &self.connections, marketplace).await?;
        Ok(status)
    }

    /// Cancels every active operation and the pairing watcher
    pub async fn shutdown(&self) {
        let targets: Vec<OperationTarget> = self
            .registry
            .iter()
            .filter(|entry| entry.operation.state().is_active())
            .map(|entry| *entry.key())
            .collect();
        for target in &targets {
            self.cancel(target);
        }
        self.cancel_pairing().await;
        info!(cancelled = targets.len(), "Orchestrator shut down");
    }
}

async fn refresh(
    marketplace: &dyn IMarketplaceConnector,
    connections: &DashMap<Marketplace, ConnectionStatus>,
    which: Marketplace,
) -> Result<ConnectionStatus, ApiError> {
    let status = marketplace.connection_status(which).await?;
    debug!(marketplace = %which, connected = status.connected, "Connection status refreshed");
    connections.insert(which, status.clone());
    Ok(status)
}

// ============================================================================
// Observer wrappers
// ============================================================================

/// Keeps the registry in step with a poller and gates the caller's observer
struct TrackingObserver {
    registry: Registry,
    target: OperationTarget,
    operation: OperationId,
    gate: Arc<DeliveryGate>,
    inner: Arc<dyn ProgressObserver>,
}

impl ProgressObserver for TrackingObserver {
    fn on_update(&self, messages: &[ProgressMessage], status: JobStatus) {
        self.gate.deliver(|| self.inner.on_update(messages, status));
    }

    fn on_terminal(&self, outcome: JobOutcome) {
        let next = match &outcome {
            JobOutcome::Completed { .. } => OperationState::Succeeded,
            JobOutcome::Failed { reason, .. } => OperationState::Failed(reason.clone()),
        };

        {
            let Some(mut entry) = self.registry.get_mut(&self.target) else {
                return;
            };
            if entry.operation.id() != self.operation
                || *entry.operation.state() != OperationState::Polling
            {
                debug!(target = %self.target, "Dropping outcome for superseded operation");
                return;
            }
            if let Err(e) = entry.operation.transition_to(next) {
                warn!(target = %self.target, error = %e, "Could not record outcome");
                return;
            }
            entry.poller = None;
        }

        info!(target = %self.target, outcome = %outcome.summary(), "Operation finished");
        self.inner.on_terminal(outcome);
    }
}

/// Refreshes Poshmark connection status when a pairing is fulfilled
struct RefreshingPairingObserver {
    marketplace: Arc<dyn IMarketplaceConnector>,
    connections: Arc<DashMap<Marketplace, ConnectionStatus>>,
    inner: Arc<dyn PairingObserver>,
}

impl PairingObserver for RefreshingPairingObserver {
    fn on_status(&self, report: &PairingStatusReport) {
        self.inner.on_status(report);
    }

    fn on_fulfilled(&self, code: &PairingCode) {
        let marketplace = Arc::clone(&self.marketplace);
        let connections = Arc::clone(&self.connections);
        let inner = Arc::clone(&self.inner);
        let code = code.clone();
        tokio::spawn(async move {
            if let Err(e) = refresh(&*marketplace, &connections, Marketplace::Poshmark).await {
                warn!(code = %code, error = %e, "Could not refresh connection after pairing");
            }
            inner.on_fulfilled(&code);
        });
    }

    fn on_expired(&self, code: &PairingCode) {
        self.inner.on_expired(code);
    }
}
