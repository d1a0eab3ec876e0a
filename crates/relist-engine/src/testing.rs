//! Scripted port implementations for engine unit tests

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use relist_core::{
    domain::{
        cookie::{Cookie, CookieSet},
        errors::ApiError,
        job::{JobSnapshot, JobStatus, ProgressMessage},
        newtypes::{JobId, ListingId, PairingCode},
        operation::Marketplace,
        pairing::{PairingStatus, PairingStatusReport, PairingTicket},
    },
    ports::{
        ConnectReceipt, ConnectionStatus, ExtensionSyncReceipt, IBrowserSurface, IJobStore,
        IMarketplaceConnector, IPairingService, JobHandle, JobRequest, PublishReceipt,
    },
};

pub(crate) fn snapshot(
    status: JobStatus,
    messages: &[&str],
    result: Option<serde_json::Value>,
) -> JobSnapshot {
    JobSnapshot {
        status,
        messages: messages.iter().map(|m| ProgressMessage::info(*m)).collect(),
        result,
        latest_message: None,
    }
}

pub(crate) fn report(status: PairingStatus, cookies_received: bool) -> PairingStatusReport {
    PairingStatusReport::new(status, cookies_received)
}

pub(crate) fn cookies(n: usize) -> Vec<Cookie> {
    let mut out = vec![Cookie::new("un", "closet_queen", ".poshmark.com")];
    for i in 1..n {
        out.push(Cookie::new(format!("c{i}"), format!("v{i}"), "poshmark.com"));
    }
    out.truncate(n);
    out
}

// ============================================================================
// Job store
// ============================================================================

pub(crate) enum Step {
    Ok(JobSnapshot),
    Err(ApiError),
}

/// Replays progress responses in order, optionally with latency
pub(crate) struct ScriptedJobStore {
    steps: Mutex<VecDeque<Step>>,
    repeat: Option<JobSnapshot>,
    latency: Duration,
    start_error: Mutex<Option<ApiError>>,
    started: Mutex<Vec<JobRequest>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedJobStore {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            repeat: None,
            latency: Duration::ZERO,
            start_error: Mutex::new(None),
            started: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answers every query with the same snapshot
    pub(crate) fn repeating(snapshot: JobSnapshot) -> Self {
        let mut store = Self::new(Vec::new());
        store.repeat = Some(snapshot);
        store
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn fail_next_start(&self, error: ApiError) {
        *self.start_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn started(&self) -> Vec<JobRequest> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IJobStore for ScriptedJobStore {
    async fn start_job(&self, request: JobRequest) -> Result<JobHandle, ApiError> {
        if let Some(err) = self.start_error.lock().unwrap().take() {
            return Err(err);
        }
        let mut started = self.started.lock().unwrap();
        started.push(request);
        let id = JobId::new(format!("job-{}", started.len())).unwrap();
        Ok(JobHandle::new(id, request.kind()))
    }

    async fn get_progress(&self, _job: &JobHandle) -> Result<JobSnapshot, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.steps.lock().unwrap().pop_front() {
            Some(Step::Ok(s)) => Ok(s),
            Some(Step::Err(e)) => Err(e),
            None => Ok(self
                .repeat
                .clone()
                .unwrap_or_else(|| snapshot(JobStatus::Pending, &[], None))),
        }
    }
}

// ============================================================================
// Pairing service
// ============================================================================

/// Issues sequential codes and replays status reports
pub(crate) struct ScriptedPairingService {
    reports: Mutex<VecDeque<PairingStatusReport>>,
    sync_result: Mutex<Option<ApiError>>,
    issued: AtomicUsize,
    status_calls: AtomicUsize,
    synced: Mutex<Vec<(PairingCode, usize, Option<String>)>>,
}

impl ScriptedPairingService {
    pub(crate) fn new(reports: Vec<PairingStatusReport>) -> Self {
        Self {
            reports: Mutex::new(reports.into()),
            sync_result: Mutex::new(None),
            issued: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            synced: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn fail_sync(&self, error: ApiError) {
        *self.sync_result.lock().unwrap() = Some(error);
    }

    pub(crate) fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn synced(&self) -> Vec<(PairingCode, usize, Option<String>)> {
        self.synced.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IPairingService for ScriptedPairingService {
    async fn request_code(&self) -> Result<PairingTicket, ApiError> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PairingTicket {
            code: PairingCode::new(format!("{:06}", 482912 + n)).unwrap(),
            expires_in_seconds: 600,
            expires_at: None,
        })
    }

    async fn pairing_status(&self, _code: &PairingCode) -> Result<PairingStatusReport, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .reports
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| report(PairingStatus::Pending, false)))
    }

    async fn sync_extension(
        &self,
        code: &PairingCode,
        cookies: &CookieSet,
        username: Option<&str>,
    ) -> Result<ExtensionSyncReceipt, ApiError> {
        if let Some(err) = self.sync_result.lock().unwrap().take() {
            return Err(err);
        }
        self.synced.lock().unwrap().push((
            code.clone(),
            cookies.len(),
            username.map(str::to_string),
        ));
        Ok(ExtensionSyncReceipt {
            username: username.map(str::to_string),
            message: Some("Cookies synced successfully".into()),
        })
    }
}

// ============================================================================
// Marketplace connector
// ============================================================================

#[derive(Default)]
pub(crate) struct FakeMarketplace {
    connect_error: Mutex<Option<ApiError>>,
    publish_error: Mutex<Option<ApiError>>,
    connects: AtomicUsize,
    status_calls: AtomicUsize,
    publishes: Mutex<Vec<ListingId>>,
    publish_latency: Mutex<Duration>,
}

impl FakeMarketplace {
    pub(crate) fn fail_connect(&self, error: ApiError) {
        *self.connect_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn fail_publish(&self, error: ApiError) {
        *self.publish_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn delay_publish(&self, latency: Duration) {
        *self.publish_latency.lock().unwrap() = latency;
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn publishes(&self) -> Vec<ListingId> {
        self.publishes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IMarketplaceConnector for FakeMarketplace {
    async fn connect_with_cookies(&self, cookies: &CookieSet) -> Result<ConnectReceipt, ApiError> {
        if let Some(err) = self.connect_error.lock().unwrap().take() {
            return Err(err);
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(ConnectReceipt {
            username: cookies.username().map(str::to_string),
        })
    }

    async fn connection_status(
        &self,
        marketplace: Marketplace,
    ) -> Result<ConnectionStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ConnectionStatus {
            marketplace,
            connected: self.connects() > 0 || marketplace == Marketplace::Poshmark,
            username: Some("closet_queen".into()),
        })
    }

    async fn disconnect(&self, _marketplace: Marketplace) -> Result<(), ApiError> {
        Ok(())
    }

    async fn publish_ebay(&self, listing_id: ListingId) -> Result<PublishReceipt, ApiError> {
        let latency = *self.publish_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = self.publish_error.lock().unwrap().take() {
            return Err(err);
        }
        self.publishes.lock().unwrap().push(listing_id);
        Ok(PublishReceipt {
            external_id: Some("110552234".into()),
            url: Some("https://www.ebay.com/itm/110552234".into()),
            message: Some("Processed".into()),
        })
    }
}

// ============================================================================
// Browser surface
// ============================================================================

/// Browser that always holds the same cookies
pub(crate) struct StaticBrowser {
    cookies: Vec<Cookie>,
    latency: Duration,
}

impl StaticBrowser {
    pub(crate) fn new(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies,
            latency: Duration::ZERO,
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait::async_trait]
impl IBrowserSurface for StaticBrowser {
    async fn cookies_for_domain(&self, _domain: &str) -> anyhow::Result<Vec<Cookie>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.cookies.clone())
    }
}
