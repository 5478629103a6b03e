//! Query-string decoding step.
//!
//! Best-effort: segments without `=` or with an empty key are dropped, the
//! rest are percent-decoded and written into the event. An event with no
//! usable segment is rejected so downstream steps can skip it.

use std::borrow::Cow;

use tracing::debug;

use super::{Step, StepOutcome};
use crate::error::Result;
use crate::model::TrackingEvent;

/// Decodes `event.raw_query()` into `event.fields()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryStringDecoder;

impl Step for QueryStringDecoder {
    fn name(&self) -> &str {
        "query_string_decoder"
    }

    fn apply(&self, event: &mut TrackingEvent) -> Result<StepOutcome> {
        let pairs = parse_query(event.raw_query());

        if pairs.is_empty() {
            debug!(event_id = %event.id(), "no decodable segments, rejecting event");
            event.reject();
            return Ok(StepOutcome::Rejected);
        }

        // In order, so a repeated key keeps its last value.
        for (key, value) in pairs {
            event.set_field(key, value);
        }
        Ok(StepOutcome::Applied)
    }
}

/// Split a raw query string into decoded key/value pairs, in input order.
///
/// A single leading `?` is tolerated. Empty segments, segments without `=`,
/// and segments whose key is empty are skipped.
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);

    raw.split('&')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (decode_component(key), decode_component(value)))
        .collect()
}

/// Percent-decode one component, treating `+` as a space.
///
/// Bytes that are not valid UTF-8 after decoding are replaced rather than
/// failing the component.
pub fn decode_component(component: &str) -> String {
    let spaced: Cow<'_, str> = if component.contains('+') {
        Cow::Owned(component.replace('+', " "))
    } else {
        Cow::Borrowed(component)
    };
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}
