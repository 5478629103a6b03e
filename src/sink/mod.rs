//! Event stream sinks.
//!
//! The pipeline only needs one operation from a sink: publish an encoded
//! event and eventually report whether delivery succeeded.

pub mod eventhub;

pub use eventhub::EventHubSink;

use async_trait::async_trait;

use crate::error::Result;

/// An append-only event stream the publisher can hand events to.
///
/// Implementations are shared by all concurrent requests and must be safe
/// for concurrent use.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Deliver one encoded event.
    async fn publish(&self, payload: Vec<u8>) -> Result<()>;
}
