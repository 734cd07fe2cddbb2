//! Event-bus plumbing.
//!
//! This module provides:
//! - The `EventSink` contract the handlers publish through
//! - The lapin-backed RabbitMQ publisher
//! - The detached dispatcher that keeps publishing off the response path
//!
//! ## Architecture
//!
//! ```text
//! Tracking hit → handler → Dispatcher (detached, timed) → EventSink → tracking_events queue
//! ```

pub mod dispatch;
pub mod publisher;
pub mod sink;

pub use dispatch::Dispatcher;
pub use publisher::Publisher;
pub use sink::EventSink;

/// Default queue name for tracking events.
pub const TRACKING_QUEUE: &str = "tracking_events";
