//! Shared test doubles for the pipeline and endpoint tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pixel_beacon::error::{Error, Result};
use pixel_beacon::model::TrackingEvent;
use pixel_beacon::pipeline::{Step, StepOutcome};
use pixel_beacon::sink::EventSink;

/// Sink that keeps every payload it receives.
#[derive(Default)]
pub struct RecordingSink {
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    /// Every payload, parsed as JSON.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.payloads
            .lock()
            .unwrap()
            .iter()
            .map(|p| serde_json::from_slice(p).expect("payload is JSON"))
            .collect()
    }

    /// Wait until at least `n` payloads have arrived, or panic after 2s.
    pub async fn wait_for(&self, n: usize) {
        wait_until(|| self.count() >= n).await;
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<()> {
        self.payloads.lock().unwrap().push(payload);
        Ok(())
    }
}

/// Sink that is always unreachable.
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn wait_for(&self, n: usize) {
        wait_until(|| self.attempts() >= n).await;
    }
}

#[async_trait]
impl EventSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn publish(&self, _payload: Vec<u8>) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::Sink("connection refused".to_string()))
    }
}

/// Step that returns an error without touching the event.
pub struct ErrStep;

impl Step for ErrStep {
    fn name(&self) -> &str {
        "err_step"
    }

    fn apply(&self, _event: &mut TrackingEvent) -> Result<StepOutcome> {
        Err(Error::Other("lookup table unavailable".to_string()))
    }
}

/// Step that writes half its work and then panics.
pub struct PanicStep;

impl Step for PanicStep {
    fn name(&self) -> &str {
        "panic_step"
    }

    fn apply(&self, event: &mut TrackingEvent) -> Result<StepOutcome> {
        event.set_field("half", "done");
        panic!("enrichment blew up");
    }
}

/// Step that stamps a fixed field, like a future enrichment step would.
pub struct StampStep {
    pub key: &'static str,
    pub value: &'static str,
}

impl Step for StampStep {
    fn name(&self) -> &str {
        "stamp_step"
    }

    fn apply(&self, event: &mut TrackingEvent) -> Result<StepOutcome> {
        event.set_field(self.key, self.value);
        Ok(StepOutcome::Applied)
    }
}

/// Step that rejects every event.
pub struct RejectStep;

impl Step for RejectStep {
    fn name(&self) -> &str {
        "reject_step"
    }

    fn apply(&self, event: &mut TrackingEvent) -> Result<StepOutcome> {
        event.reject();
        Ok(StepOutcome::Rejected)
    }
}

/// Give spawned publish tasks a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !done() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for sink");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
