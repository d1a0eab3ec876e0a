//! Bridges engine callbacks to the command's async loop
//!
//! Observers run on engine tasks, so they only forward events over a
//! channel; the command prints them and decides when to stop.

use anyhow::Result;
use relist_core::domain::{
    job::{JobOutcome, JobStatus, ProgressMessage},
    newtypes::PairingCode,
    operation::OperationTarget,
    pairing::PairingStatusReport,
};
use relist_engine::{Orchestrator, PairingObserver, ProgressObserver};
use tokio::sync::mpsc;

use crate::output::OutputFormatter;

#[derive(Debug)]
pub enum JobEvent {
    Update(Vec<ProgressMessage>, JobStatus),
    Terminal(JobOutcome),
}

pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_update(&self, messages: &[ProgressMessage], status: JobStatus) {
        let _ = self.tx.send(JobEvent::Update(messages.to_vec(), status));
    }

    fn on_terminal(&self, outcome: JobOutcome) {
        let _ = self.tx.send(JobEvent::Terminal(outcome));
    }
}

/// Prints only the messages not shown yet
///
/// The backend resends the full log on every poll.
#[derive(Default)]
pub struct MessagePrinter {
    shown: usize,
}

impl MessagePrinter {
    pub fn print(&mut self, messages: &[ProgressMessage], fmt: &dyn OutputFormatter) {
        for message in messages.iter().skip(self.shown) {
            fmt.progress(message);
        }
        self.shown = self.shown.max(messages.len());
    }

    /// Prints the rest of the log for a finished job
    ///
    /// The last entry is held back when it is the outcome's summary, which
    /// the command reports on its own.
    pub fn finish(&mut self, outcome: &JobOutcome, fmt: &dyn OutputFormatter) {
        let messages = outcome.messages();
        let summary = outcome.summary();
        let end = match messages.last() {
            Some(last) if last.message == summary => messages.len() - 1,
            _ => messages.len(),
        };
        self.print(&messages[..end], fmt);
        self.shown = self.shown.max(messages.len());
    }
}

/// Prints progress until the job ends or the user presses Ctrl-C
///
/// Returns `None` when the operation was cancelled.
pub async fn follow_job(
    orchestrator: &Orchestrator,
    target: OperationTarget,
    mut events: mpsc::UnboundedReceiver<JobEvent>,
    fmt: &dyn OutputFormatter,
) -> Result<Option<JobOutcome>> {
    let mut printer = MessagePrinter::default();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                orchestrator.cancel(&target);
                fmt.warn("Cancelled; the backend job may still finish on its own");
                return Ok(None);
            }
            event = events.recv() => match event {
                Some(JobEvent::Update(messages, _status)) => printer.print(&messages, fmt),
                Some(JobEvent::Terminal(outcome)) => {
                    printer.finish(&outcome, fmt);
                    return Ok(Some(outcome));
                }
                None => anyhow::bail!("Progress stream for {target} ended unexpectedly"),
            }
        }
    }
}

/// JSON form of a terminal outcome
pub fn outcome_json(target: &OperationTarget, outcome: &JobOutcome) -> serde_json::Value {
    match outcome {
        JobOutcome::Completed { result, messages } => serde_json::json!({
            "success": true,
            "target": target.to_string(),
            "messages": messages,
            "result": result,
        }),
        JobOutcome::Failed { reason, messages } => serde_json::json!({
            "success": false,
            "target": target.to_string(),
            "error": reason,
            "messages": messages,
        }),
    }
}

#[derive(Debug)]
pub enum PairingEvent {
    Status(PairingStatusReport),
    Fulfilled(PairingCode),
    Expired(PairingCode),
}

pub struct PairingChannelObserver {
    tx: mpsc::UnboundedSender<PairingEvent>,
}

impl PairingChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PairingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PairingObserver for PairingChannelObserver {
    fn on_status(&self, report: &PairingStatusReport) {
        let _ = self.tx.send(PairingEvent::Status(report.clone()));
    }

    fn on_fulfilled(&self, code: &PairingCode) {
        let _ = self.tx.send(PairingEvent::Fulfilled(code.clone()));
    }

    fn on_expired(&self, code: &PairingCode) {
        let _ = self.tx.send(PairingEvent::Expired(code.clone()));
    }
}
