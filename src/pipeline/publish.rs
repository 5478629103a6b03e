//! Event publishing step.
//!
//! Serializes the decoded fields and hands them to the sink without waiting
//! for the result. Nothing that goes wrong here leaves this step.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::{Instrument, debug, warn};

use super::{Step, StepOutcome};
use crate::error::Result;
use crate::model::TrackingEvent;
use crate::sink::EventSink;
use crate::telemetry::metrics;

/// Publishes actionable events to an [`EventSink`], fire-and-forget.
pub struct EventPublisher {
    sink: Arc<dyn EventSink>,
}

impl EventPublisher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }
}

impl Step for EventPublisher {
    fn name(&self) -> &str {
        "event_publisher"
    }

    fn apply(&self, event: &mut TrackingEvent) -> Result<StepOutcome> {
        if !event.is_ok() {
            debug!(event_id = %event.id(), "event rejected upstream, not publishing");
            return Ok(StepOutcome::Skipped);
        }

        let payload = match encode_fields(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(event_id = %event.id(), error = %e, "could not encode event");
                record_publish("not_dispatched");
                return Ok(StepOutcome::Rejected);
            }
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(event_id = %event.id(), error = %e, "no async runtime, event dropped");
                record_publish("not_dispatched");
                return Ok(StepOutcome::Rejected);
            }
        };

        let sink = Arc::clone(&self.sink);
        let event_id = event.id();
        let span = tracing::debug_span!("pixel.publish", "pixel.event.id" = %event_id);

        // Detached: the request does not wait for the sink.
        runtime.spawn(
            async move {
                let start = Instant::now();
                let result = sink.publish(payload).await;
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                metrics::publish_duration_ms().record(elapsed_ms, &[]);

                match result {
                    Ok(()) => {
                        debug!(event_id = %event_id, sink = sink.name(), elapsed_ms, "event published");
                        record_publish("ok");
                    }
                    Err(e) => {
                        warn!(event_id = %event_id, sink = sink.name(), error = %e, "publish failed, event dropped");
                        record_publish("error");
                    }
                }
            }
            .instrument(span),
        );

        Ok(StepOutcome::Applied)
    }
}

/// Encode an event's fields as a flat JSON object with sorted keys.
pub fn encode_fields(event: &TrackingEvent) -> Result<Vec<u8>> {
    let ordered: BTreeMap<&str, &str> = event
        .fields()
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    Ok(serde_json::to_vec(&ordered)?)
}

fn record_publish(result: &'static str) {
    metrics::publishes().add(1, &[KeyValue::new("result", result)]);
}
