//! Sink contract for handing events to the bus.

use anyhow::Result;
use async_trait::async_trait;

use crate::event::TrackingEvent;

/// Destination for tracking events.
///
/// The production implementation publishes to RabbitMQ; tests substitute
/// recording or failing doubles. The sink owns durability and at-least-once
/// delivery; callers hand an event over exactly once and keep no copy.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &TrackingEvent) -> Result<()>;
}
