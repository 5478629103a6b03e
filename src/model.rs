//! Core data model.
//!
//! A tracking event is one beacon hit: the raw query string it arrived with,
//! the fields decoded from it so far, and a rolling success flag that steps
//! consult cooperatively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Event identity
// ---------------------------------------------------------------------------

/// Newtype for tracking event IDs. Used for log correlation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tracking Event
// ---------------------------------------------------------------------------

/// The record threaded through the pipeline for a single request.
///
/// The accessors enforce the event's invariants: `raw_query` cannot change
/// after construction, fields can be added or overwritten but never removed,
/// and `ok` can only go from `true` to `false`.
#[derive(Debug, Clone)]
pub struct TrackingEvent {
    id: EventId,
    received_at: DateTime<Utc>,
    raw_query: String,
    fields: HashMap<String, String>,
    ok: bool,
}

impl TrackingEvent {
    pub fn new(raw_query: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            received_at: Utc::now(),
            raw_query: raw_query.into(),
            fields: HashMap::new(),
            ok: true,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// The query string exactly as received.
    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Insert a field, replacing any previous value for the key.
    /// Returns the replaced value.
    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    /// Whether later steps should still treat this event as actionable.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Mark the event as non-actionable. There is no way back.
    pub fn reject(&mut self) {
        self.ok = false;
    }
}
