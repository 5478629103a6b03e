//! Request-processing pipeline: step contract and chain executor.
//!
//! A [`Chain`] owns an ordered list of [`Step`]s and runs every one of them
//! against a [`TrackingEvent`]. The chain never short-circuits: a step that
//! wants to no-op on a rejected event checks [`TrackingEvent::is_ok`] itself.
//! Adding an enrichment step is a change to the list handed to the
//! [`ChainBuilder`], not to any existing step.

pub mod decode;
pub mod publish;

pub use decode::QueryStringDecoder;
pub use publish::EventPublisher;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::error;

use crate::error::Result;
use crate::model::TrackingEvent;
use crate::sink::EventSink;
use crate::telemetry::metrics;
use crate::telemetry::pipeline::{record_event_result, record_step, start_event_span};

/// What a step reports after running. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step did its work.
    Applied,
    /// The step chose not to act (e.g. the event was already rejected).
    Skipped,
    /// The step ran but could not do its work.
    Rejected,
}

impl StepOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Applied | Self::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Rejected => "rejected",
        }
    }
}

/// One transformation applied to a tracking event.
///
/// Implementations mutate the event in place and must return quickly: any
/// slow external work is dispatched, not awaited. An `Err` (or a panic) is
/// treated by the chain as a recoverable fault of this step only.
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, event: &mut TrackingEvent) -> Result<StepOutcome>;
}

/// Completion signal for one chain run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainOutcome {
    /// Whether the last executed step reported success.
    pub success: bool,
    /// Number of steps executed.
    pub steps_run: usize,
}

/// An ordered sequence of steps.
#[derive(Clone, Default)]
pub struct Chain {
    steps: Vec<Arc<dyn Step>>,
}

impl Chain {
    pub fn new(steps: Vec<Arc<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    /// The default beacon chain: decode the query string, then publish.
    pub fn standard(sink: Arc<dyn EventSink>) -> Self {
        Self::builder()
            .step(QueryStringDecoder)
            .step(EventPublisher::new(sink))
            .build()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step, in order, against `event`.
    ///
    /// Step faults are logged and counted, then the next step runs.
    pub fn run(&self, event: &mut TrackingEvent) -> ChainOutcome {
        let span = start_event_span(event.id(), self.steps.len());
        let _enter = span.enter();

        // An empty chain has nothing to fail.
        let mut success = true;
        let mut steps_run = 0;

        for step in &self.steps {
            let name = step.name();
            let result = catch_unwind(AssertUnwindSafe(|| step.apply(event)));
            steps_run += 1;

            let label = match result {
                Ok(Ok(outcome)) => {
                    success = outcome.is_success();
                    outcome.as_str()
                }
                Ok(Err(e)) => {
                    error!(event_id = %event.id(), step = name, error = %e, "step failed");
                    success = false;
                    "fault"
                }
                Err(panic) => {
                    error!(
                        event_id = %event.id(),
                        step = name,
                        panic = panic_message(panic.as_ref()),
                        "step panicked"
                    );
                    success = false;
                    "fault"
                }
            };

            record_step(&span, name, label);
            metrics::step_outcomes().add(
                1,
                &[
                    KeyValue::new("step", name.to_string()),
                    KeyValue::new("outcome", label),
                ],
            );
        }

        record_event_result(&span, event.is_ok());
        ChainOutcome { success, steps_run }
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("steps", &self.step_names())
            .finish()
    }
}

/// Builds a [`Chain`] by appending or inserting steps.
#[derive(Default)]
pub struct ChainBuilder {
    steps: Vec<Arc<dyn Step>>,
}

impl ChainBuilder {
    /// Append a step to the end of the chain.
    pub fn step<S: Step + 'static>(mut self, step: S) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Append an already-shared step.
    pub fn shared_step(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Insert a step at `index`, clamped to the current length.
    pub fn insert<S: Step + 'static>(mut self, index: usize, step: S) -> Self {
        let index = index.min(self.steps.len());
        self.steps.insert(index, Arc::new(step));
        self
    }

    pub fn build(self) -> Chain {
        Chain::new(self.steps)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
