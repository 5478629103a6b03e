//! Metric instrument factories for pixel-beacon.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"pixel-beacon"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for pixel-beacon instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("pixel-beacon")
}

/// Counter: pixel requests served.
pub fn pixel_requests() -> Counter<u64> {
    meter()
        .u64_counter("pixel.requests")
        .with_description("Number of pixel requests served")
        .build()
}

/// Counter: step executions by outcome.
/// Labels: `step`, `outcome` ("applied" | "skipped" | "rejected" | "fault").
pub fn step_outcomes() -> Counter<u64> {
    meter()
        .u64_counter("pixel.pipeline.step_outcomes")
        .with_description("Number of pipeline step executions by outcome")
        .build()
}

/// Counter: sink publishes.
/// Labels: `result` ("ok" | "error" | "not_dispatched").
pub fn publishes() -> Counter<u64> {
    meter()
        .u64_counter("pixel.sink.publishes")
        .with_description("Number of event publishes to the sink")
        .build()
}

/// Histogram: publish round-trip in milliseconds.
pub fn publish_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("pixel.sink.publish_duration_ms")
        .with_description("Sink publish duration in milliseconds")
        .with_unit("ms")
        .build()
}
