//! Detached publish dispatch.
//!
//! The client-visible artifact (pixel, redirect, confirmation page) must be
//! written even when the event bus is slow or down, and a client hanging up
//! mid-response must not cancel an in-flight publish. Publishing therefore
//! runs on its own task with a fixed timeout budget; the outcome is logged
//! and never reaches the response path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::sink::EventSink;
use crate::event::TrackingEvent;

/// Hands events to the sink without making the caller wait.
#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn EventSink>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn EventSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// Spawn a detached publish for the event.
    ///
    /// Returns immediately. The spawned task owns the event and applies the
    /// configured timeout independently of the inbound request's lifetime.
    pub fn dispatch(&self, event: TrackingEvent) {
        let sink = Arc::clone(&self.sink);
        let timeout = self.timeout;

        tokio::spawn(async move {
            let message_id = event.message_id();
            match tokio::time::timeout(timeout, sink.publish(&event)).await {
                Ok(Ok(())) => {
                    info!(message_id = %message_id, "event_published");
                }
                Ok(Err(e)) => {
                    error!(message_id = %message_id, error = %e, "event_publish_failed");
                }
                Err(_) => {
                    warn!(
                        message_id = %message_id,
                        timeout_ms = timeout.as_millis() as u64,
                        "event_publish_timeout"
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::event::EventKind;
    use crate::token::TokenFields;

    fn event() -> TrackingEvent {
        TrackingEvent::from_token(
            EventKind::Open,
            TokenFields {
                org_id: "org1".to_string(),
                campaign_id: "camp1".to_string(),
                subscriber_id: "sub1".to_string(),
                email_id: Some("email1".to_string()),
                link_url: None,
            },
            "198.51.100.4".to_string(),
            "TestAgent/1.0".to_string(),
        )
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<TrackingEvent>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn publish(&self, event: &TrackingEvent) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FailingSink {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventSink for FailingSink {
        async fn publish(&self, _event: &TrackingEvent) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            bail!("bus unavailable")
        }
    }

    struct HangingSink;

    #[async_trait]
    impl EventSink for HangingSink {
        async fn publish(&self, _event: &TrackingEvent) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_dispatch_publishes_exactly_once() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(sink.clone(), Duration::from_millis(200));

        let sent = event();
        dispatcher.dispatch(sent.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;

        let recorded = sink.events.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0], sent);
    }

    #[tokio::test]
    async fn test_dispatch_absorbs_sink_failure() {
        let sink = Arc::new(FailingSink::default());
        let dispatcher = Dispatcher::new(sink.clone(), Duration::from_millis(200));

        dispatcher.dispatch(event());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_returns_immediately_with_hanging_sink() {
        let dispatcher = Dispatcher::new(Arc::new(HangingSink), Duration::from_secs(30));

        let start = Instant::now();
        dispatcher.dispatch(event());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_publish_times_out() {
        let dispatcher = Dispatcher::new(Arc::new(HangingSink), Duration::from_millis(500));

        dispatcher.dispatch(event());
        // With paused time the runtime advances past the timeout as soon as
        // every task is idle; the spawned publish must finish, not hang.
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
