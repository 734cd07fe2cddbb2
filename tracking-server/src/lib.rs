//! MailBeacon tracking-event ingestion service.
//!
//! This library backs the `mailbeacon-server` binary: a thin, fast HTTP
//! server that receives tracking hits generated when a recipient opens an
//! email, clicks a link, or unsubscribes.
//!
//! ## Architecture
//!
//! ```text
//! Tracking hit → Router → TokenCodec (verify + decode) → TrackingEvent
//!                                  ↓ (detached, timed)
//!                            tracking_events queue
//! ```
//!
//! The client-visible artifact (pixel, redirect, confirmation page) is
//! written regardless of publish outcome; the event bus is never on the
//! response path.

pub mod config;
pub mod event;
pub mod queue;
pub mod token;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use event::{EventKind, TrackingEvent};
pub use queue::{Dispatcher, EventSink, Publisher, TRACKING_QUEUE};
pub use token::{TokenCodec, TokenError, TokenFields};
pub use web::AppState;
