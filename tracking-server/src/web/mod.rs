//! HTTP surface for tracking hits.
//!
//! Routes:
//! - `GET /track/open/:data/:sig` - open pixel
//! - `GET /track/click/:data/:sig` - click redirect
//! - `GET /track/unsubscribe/:data/:sig` - unsubscribe confirmation
//! - `GET /health` - liveness check
//!
//! Each tracking route decodes and verifies the token, hands the event to
//! the detached dispatcher, and writes its fixed artifact. Per-route
//! failure policy lives in the handlers.

pub mod handlers;
pub mod responses;

use axum::{routing::get, Router};

pub use handlers::{click, health, open, unsubscribe, AppState, HealthResponse};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/track/open/:data/:sig", get(open))
        .route("/track/click/:data/:sig", get(click))
        .route("/track/unsubscribe/:data/:sig", get(unsubscribe))
        .with_state(state)
}
