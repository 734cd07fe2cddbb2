//! Tracking hit handlers.
//!
//! These handlers are designed to be extremely fast - they only:
//! 1. Verify the token signature and decode the fields
//! 2. Hand the event to the detached dispatcher
//! 3. Write the fixed client-visible artifact
//!
//! The event-bus publish happens off the response path; its outcome never
//! changes what the client sees.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::event::{client_ip, user_agent, EventKind, TrackingEvent};
use crate::queue::Dispatcher;
use crate::token::TokenCodec;
use crate::web::responses::{
    bad_link_response, pixel_response, redirect_response, unsubscribe_response,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(codec: TokenCodec, dispatcher: Dispatcher) -> Self {
        Self {
            codec: Arc::new(codec),
            dispatcher,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Open
// =============================================================================

/// Open-pixel endpoint.
///
/// Always answers with the pixel. A broken image inside a rendered email is
/// worse than a dropped tracking signal, so malformed or forged tokens are
/// logged and absorbed.
pub async fn open(
    State(state): State<AppState>,
    Path((data, sig)): Path<(String, String)>,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    match state.codec.decode(EventKind::Open, &data, &sig) {
        Ok(fields) => {
            let event = TrackingEvent::from_token(
                EventKind::Open,
                fields,
                client_ip(&headers, peer),
                user_agent(&headers),
            );
            info!(
                org_id = %event.org_id,
                campaign_id = %event.campaign_id,
                subscriber_id = %event.subscriber_id,
                "open_hit"
            );
            state.dispatcher.dispatch(event);
        }
        Err(e) => {
            warn!(error = %e, "open_token_rejected");
        }
    }

    pixel_response()
}

// =============================================================================
// Click
// =============================================================================

/// Click-redirect endpoint.
///
/// The user is actively navigating, so a bad token gets an explicit 400
/// rather than a silent redirect to nowhere. On success the redirect target
/// comes from the verified token and nowhere else.
pub async fn click(
    State(state): State<AppState>,
    Path((data, sig)): Path<(String, String)>,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    match state.codec.decode(EventKind::Click, &data, &sig) {
        Ok(fields) => {
            let Some(link) = fields.link_url.clone() else {
                // Decode guarantees a link for click tokens; treat a missing
                // one as a rejected link rather than panicking.
                warn!("click_token_missing_link");
                return bad_link_response();
            };

            let event = TrackingEvent::from_token(
                EventKind::Click,
                fields,
                client_ip(&headers, peer),
                user_agent(&headers),
            );
            info!(
                org_id = %event.org_id,
                campaign_id = %event.campaign_id,
                subscriber_id = %event.subscriber_id,
                link_url = %link,
                "click_hit"
            );
            state.dispatcher.dispatch(event);

            redirect_response(&link)
        }
        Err(e) => {
            warn!(error = %e, "click_token_rejected");
            bad_link_response()
        }
    }
}

// =============================================================================
// Unsubscribe
// =============================================================================

/// Unsubscribe endpoint.
///
/// Same invalid/valid split as click; on success the recipient sees a fixed
/// confirmation page regardless of publish outcome.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path((data, sig)): Path<(String, String)>,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    match state.codec.decode(EventKind::Unsubscribe, &data, &sig) {
        Ok(fields) => {
            let event = TrackingEvent::from_token(
                EventKind::Unsubscribe,
                fields,
                client_ip(&headers, peer),
                user_agent(&headers),
            );
            info!(
                org_id = %event.org_id,
                campaign_id = %event.campaign_id,
                subscriber_id = %event.subscriber_id,
                "unsubscribe_hit"
            );
            state.dispatcher.dispatch(event);

            unsubscribe_response()
        }
        Err(e) => {
            warn!(error = %e, "unsubscribe_token_rejected");
            bad_link_response()
        }
    }
}
