//! `GET /pixel` handler.

use axum::extract::{RawQuery, State};
use axum::http::header;
use axum::response::IntoResponse;
use tracing::debug;

use super::AppState;
use crate::model::TrackingEvent;
use crate::telemetry::metrics;

/// Transparent 1x1 GIF.
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub const PIXEL_CONTENT_TYPE: &str = "image/gif";

/// Run the chain over the request's query string and answer with the pixel.
///
/// The chain outcome is only logged; the response never depends on it.
pub(super) async fn pixel(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let mut event = TrackingEvent::new(query.unwrap_or_default());
    let outcome = state.chain.run(&mut event);

    debug!(
        event_id = %event.id(),
        ok = event.is_ok(),
        fields = event.fields().len(),
        success = outcome.success,
        steps_run = outcome.steps_run,
        "pixel request handled"
    );
    metrics::pixel_requests().add(1, &[]);

    (
        [
            (header::CONTENT_TYPE, PIXEL_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        ],
        PIXEL_GIF,
    )
}
