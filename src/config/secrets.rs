//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for the sink key, so callers do not
//! need a direct secrecy dependency to build a [`SinkConfig`](super::SinkConfig).

pub use secrecy::{ExposeSecret, SecretString};
