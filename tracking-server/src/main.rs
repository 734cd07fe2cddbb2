//! MailBeacon tracking server.
//!
//! This binary provides a thin, fast web server that:
//! - Receives tracking hits for opens, clicks, and unsubscribes
//! - Verifies and decodes the signed per-recipient token
//! - Hands events to RabbitMQ on a detached timeout budget
//! - Answers with the fixed per-route artifact in microseconds
//!
//! A slow or down event bus never degrades the client-visible response.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailbeacon::web::router;
use mailbeacon::{AppState, Config, Dispatcher, EventSink, Publisher, TokenCodec};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("tracking_server_starting");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        port = config.port,
        queue = %config.tracking_queue,
        publish_timeout_ms = config.publish_timeout_ms,
        "config_loaded"
    );

    // Create RabbitMQ publisher and the detached dispatcher around it
    let publisher = Publisher::new(config.amqp_url.clone(), config.tracking_queue.clone());
    let sink: Arc<dyn EventSink> = Arc::new(publisher.clone());
    let dispatcher = Dispatcher::new(sink, Duration::from_millis(config.publish_timeout_ms));

    // Create application state
    let state = AppState::new(TokenCodec::new(config.token_signing_key.clone()), dispatcher);

    // Build the router
    let app = router(state).layer(TraceLayer::new_for_http());

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "tracking_server_listening");

    // Run server with graceful shutdown; connect-info lets handlers fall
    // back to the peer address when no proxy headers are present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // Close publisher connection
    publisher.close().await;

    info!("tracking_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("tracking_server_shutting_down");
}
