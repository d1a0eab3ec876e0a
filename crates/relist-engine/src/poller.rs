//! Progress poller - turns a polled job store into a stream of callbacks
//!
//! The backend has no push channel for job progress, so the client polls
//! it. A [`ProgressPoller`] spawns one tokio task per job that queries
//! [`IJobStore::get_progress`] on a fixed interval and reports to a
//! [`ProgressObserver`].
//!
//! ## Guarantees
//!
//! - **Single-flight**: the query is awaited inside the loop and missed
//!   ticks are skipped, so a job never has two outstanding requests.
//! - **Cancellation**: once [`PollerHandle::cancel`] returns, no callback
//!   fires, even for a response that was already in flight.
//! - **Terminal once**: a completed or failed snapshot stops the task and
//!   is delivered exactly once through `on_terminal`; it never goes
//!   through `on_update`.
//! - Network errors are logged and retried on the next tick. Any other
//!   query error ends polling with a single failed outcome.

use std::{sync::Arc, time::Duration};

use relist_core::{
    domain::job::{Job, JobOutcome, JobStatus, ProgressMessage},
    ports::{IJobStore, JobHandle},
};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default interval between progress queries
pub const DEFAULT_JOB_INTERVAL: Duration = Duration::from_secs(2);

// ============================================================================
// ProgressObserver
// ============================================================================

/// Receives progress for one job
///
/// Callbacks run on the poller task; keep them short and non-blocking.
pub trait ProgressObserver: Send + Sync {
    /// A non-terminal snapshot arrived; `messages` is the full log so far
    fn on_update(&self, messages: &[ProgressMessage], status: JobStatus);

    /// The job reached a terminal status; called exactly once
    fn on_terminal(&self, outcome: JobOutcome);
}

// ============================================================================
// PollerHandle
// ============================================================================

/// Handle to a running poller task
///
/// Dropping the handle does not stop the task; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct PollerHandle {
    job: JobHandle,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// The job being polled
    pub fn job(&self) -> &JobHandle {
        &self.job
    }

    /// Stops polling; no callback fires after this returns
    ///
    /// Calling it again, or after the job finished, is a no-op.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(job_id = %self.job.id, "Cancelling progress poller");
            self.token.cancel();
        }
    }

    /// Returns true once cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns true once the polling task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the polling task to exit
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(job_id = %self.job.id, error = %e, "Progress poller task failed");
        }
    }
}

// ============================================================================
// ProgressPoller
// ============================================================================

/// Spawns polling tasks at a fixed interval
#[derive(Debug, Clone)]
pub struct ProgressPoller {
    interval: Duration,
}

impl Default for ProgressPoller {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_INTERVAL)
    }
}

impl ProgressPoller {
    /// Creates a poller that queries every `interval`
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts polling `job` on a new task
    ///
    /// The first query is made one interval after the call.
    ///
    /// # Arguments
    /// * `store` - Job store to query
    /// * `job` - The job to follow
    /// * `observer` - Receives updates and the terminal outcome
    pub fn start(
        &self,
        store: Arc<dyn IJobStore>,
        job: JobHandle,
        observer: Arc<dyn ProgressObserver>,
    ) -> PollerHandle {
        let token = CancellationToken::new();
        info!(
            job_id = %job.id,
            kind = %job.kind,
            interval_ms = self.interval.as_millis() as u64,
            "Starting progress poller"
        );

        let task = tokio::spawn(poll_loop(
            store,
            job.clone(),
            observer,
            self.interval,
            token.clone(),
        ));

        PollerHandle { job, token, task }
    }
}

async fn poll_loop(
    store: Arc<dyn IJobStore>,
    job: JobHandle,
    observer: Arc<dyn ProgressObserver>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut record = Job::new(job.id.clone(), job.kind);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = store.get_progress(&job) => result,
        };

        // cancel() may have landed while the response was being decoded
        if token.is_cancelled() {
            break;
        }

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_transient() => {
                warn!(job_id = %job.id, error = %e, "Progress query failed, retrying next tick");
                continue;
            }
            Err(e) => {
                error!(job_id = %job.id, kind = %e.kind(), error = %e, "Progress query failed, giving up");
                if let Some(body) = e.body() {
                    debug!(job_id = %job.id, body = %body, "Response body");
                }
                observer.on_terminal(JobOutcome::Failed {
                    reason: e.message(),
                    messages: record.messages().to_vec(),
                });
                break;
            }
        };

        match record.apply(&snapshot) {
            Ok(true) => debug!(job_id = %job.id, status = %snapshot.status, "Job progressed"),
            Ok(false) => {}
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Ignoring inconsistent snapshot");
                continue;
            }
        }

        if snapshot.status.is_terminal() {
            info!(job_id = %job.id, status = %snapshot.status, "Job finished");
            if let Some(outcome) = JobOutcome::from_snapshot(snapshot) {
                observer.on_terminal(outcome);
            }
            break;
        }

        observer.on_update(&snapshot.messages, snapshot.status);
    }

    debug!(job_id = %job.id, "Progress poller stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use relist_core::domain::{job::JobKind, newtypes::JobId};

    use super::*;
    use crate::testing::{snapshot, ScriptedJobStore, Step};

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<(Vec<String>, JobStatus)>>,
        terminals: Mutex<Vec<JobOutcome>>,
    }

    impl ProgressObserver for Recorder {
        fn on_update(&self, messages: &[ProgressMessage], status: JobStatus) {
            let texts = messages.iter().map(|m| m.message.clone()).collect();
            self.updates.lock().unwrap().push((texts, status));
        }

        fn on_terminal(&self, outcome: JobOutcome) {
            self.terminals.lock().unwrap().push(outcome);
        }
    }

    fn handle(id: &str) -> JobHandle {
        JobHandle::new(JobId::new(id.into()).unwrap(), JobKind::InventoryFetch)
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_123_scenario() {
        let store = Arc::new(ScriptedJobStore::new(vec![
            Step::Ok(snapshot(JobStatus::Pending, &["m1"], None)),
            Step::Ok(snapshot(JobStatus::Pending, &["m1", "m2"], None)),
            Step::Ok(snapshot(
                JobStatus::Completed,
                &["m1", "m2", "m3"],
                Some(serde_json::json!({"items": 3})),
            )),
        ]));
        let recorder = Arc::new(Recorder::default());

        let poller = ProgressPoller::new(Duration::from_secs(2));
        let handle = poller.start(store.clone(), handle("job-123"), recorder.clone());
        handle.join().await;

        let updates = recorder.updates.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].0, vec!["m1"]);
        assert_eq!(updates[1].0, vec!["m1", "m2"]);

        let terminals = recorder.terminals.lock().unwrap();
        assert_eq!(terminals.len(), 1);
        match &terminals[0] {
            JobOutcome::Completed { result, messages } => {
                assert_eq!(result.as_ref().unwrap()["items"], 3);
                assert_eq!(messages.len(), 3);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_uses_latest_message() {
        let store = Arc::new(ScriptedJobStore::new(vec![Step::Ok(snapshot(
            JobStatus::Failed,
            &["Logging in", "Poshmark rejected the session"],
            None,
        ))]));
        let recorder = Arc::new(Recorder::default());

        let handle = ProgressPoller::default().start(store, handle("job-f"), recorder.clone());
        handle.join().await;

        let terminals = recorder.terminals.lock().unwrap();
        assert_eq!(terminals[0].summary(), "Poshmark rejected the session");
        assert!(recorder.updates.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_are_retried() {
        use relist_core::domain::errors::ApiError;

        let store = Arc::new(ScriptedJobStore::new(vec![
            Step::Err(ApiError::Network("connection reset".into())),
            Step::Err(ApiError::Network("timed out".into())),
            Step::Ok(snapshot(JobStatus::Completed, &["done"], None)),
        ]));
        let recorder = Arc::new(Recorder::default());

        let handle = ProgressPoller::default().start(store.clone(), handle("job-e"), recorder.clone());
        handle.join().await;

        assert_eq!(store.calls(), 3);
        assert!(recorder.updates.lock().unwrap().is_empty());
        let terminals = recorder.terminals.lock().unwrap();
        assert_eq!(terminals.len(), 1);
        assert!(terminals[0].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_error_ends_polling() {
        use relist_core::domain::errors::ApiError;

        let store = Arc::new(ScriptedJobStore::new(vec![
            Step::Ok(snapshot(JobStatus::Pending, &["Logging in"], None)),
            Step::Err(ApiError::Auth("Token expired".into())),
            Step::Ok(snapshot(JobStatus::Completed, &["never seen"], None)),
        ]));
        let recorder = Arc::new(Recorder::default());

        let handle = ProgressPoller::default().start(store.clone(), handle("job-a"), recorder.clone());
        handle.join().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(store.calls(), 2);
        assert_eq!(recorder.updates.lock().unwrap().len(), 1);
        let terminals = recorder.terminals.lock().unwrap();
        assert_eq!(terminals.len(), 1);
        match &terminals[0] {
            JobOutcome::Failed { reason, messages } => {
                assert_eq!(reason, "Token expired");
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].message, "Logging in");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_protocol_error_ends_polling() {
        use relist_core::domain::errors::ApiError;

        let store = Arc::new(ScriptedJobStore::new(vec![Step::Err(
            ApiError::protocol_with_body("unexpected status 404", r#"{"detail":"job not found"}"#),
        )]));
        let recorder = Arc::new(Recorder::default());

        let handle = ProgressPoller::default().start(store.clone(), handle("job-p"), recorder.clone());
        handle.join().await;

        assert_eq!(store.calls(), 1);
        let terminals = recorder.terminals.lock().unwrap();
        assert_eq!(terminals.len(), 1);
        assert_eq!(terminals[0].summary(), "unexpected status 404");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_with_slow_responses() {
        // Each response takes 5 s while the interval is 2 s
        let store = Arc::new(
            ScriptedJobStore::new(vec![
                Step::Ok(snapshot(JobStatus::Pending, &["a"], None)),
                Step::Ok(snapshot(JobStatus::Pending, &["a", "b"], None)),
                Step::Ok(snapshot(JobStatus::Completed, &["a", "b", "c"], None)),
            ])
            .with_latency(Duration::from_secs(5)),
        );
        let recorder = Arc::new(Recorder::default());

        let handle = ProgressPoller::new(Duration::from_secs(2)).start(
            store.clone(),
            handle("job-slow"),
            recorder.clone(),
        );
        handle.join().await;

        assert_eq!(store.max_in_flight(), 1);
        assert_eq!(store.calls(), 3);
        assert_eq!(recorder.updates.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_in_flight_response() {
        let store = Arc::new(
            ScriptedJobStore::new(vec![Step::Ok(snapshot(JobStatus::Completed, &["done"], None))])
                .with_latency(Duration::from_secs(10)),
        );
        let recorder = Arc::new(Recorder::default());

        let handle = ProgressPoller::new(Duration::from_secs(2)).start(
            store.clone(),
            handle("job-c"),
            recorder.clone(),
        );

        // First query starts at t=2s and would resolve at t=12s
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.calls(), 1);
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert!(handle.is_finished());
        assert!(recorder.updates.lock().unwrap().is_empty());
        assert!(recorder.terminals.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_twice_is_noop() {
        let store = Arc::new(ScriptedJobStore::repeating(snapshot(
            JobStatus::Pending,
            &["waiting"],
            None,
        )));
        let recorder = Arc::new(Recorder::default());

        let handle = ProgressPoller::default().start(store.clone(), handle("job-d"), recorder.clone());
        tokio::time::sleep(Duration::from_millis(4500)).await;
        let seen = recorder.updates.lock().unwrap().len();
        assert_eq!(seen, 2);

        handle.cancel();
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(handle.is_cancelled());
        assert_eq!(recorder.updates.lock().unwrap().len(), seen);
        assert_eq!(store.calls(), 2);
    }
}
