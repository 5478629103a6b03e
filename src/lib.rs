//! # pixel-beacon
//!
//! Tracking pixel service. Each `GET /pixel?...` request becomes a
//! [`model::TrackingEvent`], runs through an ordered [`pipeline::Chain`] of
//! steps, and is published fire-and-forget to an event stream
//! ([`sink::EventHubSink`]). The caller always gets the pixel back.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod sink;
pub mod telemetry;
