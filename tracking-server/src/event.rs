//! Tracking events handed to the event bus.
//!
//! An event is built once per successfully decoded request and is immutable
//! afterwards. Token fields are copied verbatim; the only server-derived
//! attributes are the client IP, the user agent, and the receipt timestamp.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::token::TokenFields;

/// Kind of tracking hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Open,
    Click,
    Unsubscribe,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Click => "click",
            EventKind::Unsubscribe => "unsubscribe",
        }
    }
}

/// A single tracking event, serialized as JSON onto the queue.
///
/// `link_url` is present only for click events. Repeated hits on the same
/// token produce repeated independent events; mail clients prefetch images,
/// and downstream aggregation owns deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub event_type: EventKind,
    pub org_id: String,
    pub campaign_id: String,
    pub subscriber_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    /// Server receipt time, UTC epoch milliseconds.
    pub timestamp: u64,
}

impl TrackingEvent {
    /// Build an event from verified token fields and request-observed
    /// attributes. Nothing else from the request reaches the event.
    pub fn from_token(
        kind: EventKind,
        fields: TokenFields,
        ip_address: String,
        user_agent: String,
    ) -> Self {
        Self {
            event_type: kind,
            org_id: fields.org_id,
            campaign_id: fields.campaign_id,
            subscriber_id: fields.subscriber_id,
            email_id: fields.email_id,
            link_url: fields.link_url,
            ip_address,
            user_agent,
            timestamp: receipt_millis(),
        }
    }

    /// Message id used for queue-level tracing.
    pub fn message_id(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.event_type.as_str(),
            self.org_id,
            self.campaign_id,
            self.subscriber_id
        )
    }
}

static LAST_RECEIPT_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Current UTC time in epoch milliseconds, clamped so that events stamped
/// later in this process never carry an earlier timestamp even if the wall
/// clock steps backwards.
fn receipt_millis() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let prev = LAST_RECEIPT_MILLIS.fetch_max(now, Ordering::Relaxed);
    prev.max(now)
}

/// Resolve the client IP for an inbound hit.
///
/// Order: first element of `X-Forwarded-For`, then `X-Real-Ip`, then the
/// raw peer address.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    peer.ip().to_string()
}

/// User agent from the request header, empty when absent.
pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "203.0.113.7:55000".parse().unwrap()
    }

    fn fields() -> TokenFields {
        TokenFields {
            org_id: "org1".to_string(),
            campaign_id: "camp1".to_string(),
            subscriber_id: "sub1".to_string(),
            email_id: Some("email1".to_string()),
            link_url: None,
        }
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "198.51.100.4, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "192.0.2.9".parse().unwrap());
        assert_eq!(client_ip(&headers, peer()), "198.51.100.4");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "192.0.2.9".parse().unwrap());
        assert_eq!(client_ip(&headers, peer()), "192.0.2.9");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_ignores_blank_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "  ".parse().unwrap());
        assert_eq!(client_ip(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_user_agent_missing_is_empty() {
        assert_eq!(user_agent(&HeaderMap::new()), "");
    }

    #[test]
    fn test_from_token_copies_fields_verbatim() {
        let event = TrackingEvent::from_token(
            EventKind::Open,
            fields(),
            "198.51.100.4".to_string(),
            "TestAgent/1.0".to_string(),
        );
        assert_eq!(event.event_type, EventKind::Open);
        assert_eq!(event.org_id, "org1");
        assert_eq!(event.campaign_id, "camp1");
        assert_eq!(event.subscriber_id, "sub1");
        assert_eq!(event.email_id.as_deref(), Some("email1"));
        assert_eq!(event.link_url, None);
        assert_eq!(event.ip_address, "198.51.100.4");
        assert_eq!(event.user_agent, "TestAgent/1.0");
        assert!(event.timestamp > 0);
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let a = receipt_millis();
        let b = receipt_millis();
        assert!(b >= a);
    }

    #[test]
    fn test_serialization_skips_absent_optionals() {
        let mut f = fields();
        f.email_id = None;
        let event = TrackingEvent::from_token(
            EventKind::Open,
            f,
            "198.51.100.4".to_string(),
            String::new(),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"open\""));
        assert!(!json.contains("email_id"));
        assert!(!json.contains("link_url"));
    }

    #[test]
    fn test_message_id_format() {
        let event = TrackingEvent::from_token(
            EventKind::Click,
            TokenFields {
                link_url: Some("https://example.com".to_string()),
                ..fields()
            },
            "198.51.100.4".to_string(),
            String::new(),
        );
        assert_eq!(event.message_id(), "click-org1-camp1-sub1");
    }
}
