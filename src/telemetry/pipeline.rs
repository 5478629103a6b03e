//! Pipeline span helpers.
//!
//! Provides span creation and step recording for tracking events
//! flowing through the chain.

use tracing::Span;

use crate::model::EventId;

/// Start a span covering one event's trip through the chain.
///
/// The `pixel.ok` field is declared empty and filled in by
/// [`record_event_result`] once the chain finishes.
pub fn start_event_span(event_id: EventId, steps: usize) -> Span {
    tracing::info_span!(
        "pixel.event",
        "pixel.event.id" = %event_id,
        "pixel.chain.steps" = steps,
        "pixel.ok" = tracing::field::Empty,
    )
}

/// Record a step's outcome on the given span.
pub fn record_step(span: &Span, step: &str, outcome: &str) {
    span.in_scope(|| {
        tracing::debug!(step = step, outcome = outcome, "step_completed");
    });
}

/// Record the event's final `ok` flag on the span.
pub fn record_event_result(span: &Span, ok: bool) {
    span.record("pixel.ok", ok);
}
