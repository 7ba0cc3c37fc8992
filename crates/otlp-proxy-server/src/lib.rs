// Server mode - OTLP/HTTP debugging relay
//
// Receives OTLP exports, prints each one as a YAML document on stdout and
// passes the original request on to an upstream collector.
//
// Features:
// - Axum HTTP server (HTTP/1.1, HTTP/2)
// - Per-signal upstream forwarding with the upstream reply relayed as-is
// - Structured logging with tracing (stderr)
// - Graceful shutdown

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use otlp_proxy_codec::SignalKind;
use otlp_proxy_config::RelayConfig;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod forwarding;
mod handlers;
mod init;
pub mod relay;

pub use forwarding::{ForwardError, ForwardOutcome, Forwarder};
pub use relay::{ExportRequest, RelayError, RelayResponse, SignalRelay, FAILURE_BODY};

use handlers::{handle_logs, handle_metrics, handle_traces, health_check};
use init::{init_sink, init_tracing};

/// Application state shared across all requests
#[derive(Clone)]
pub(crate) struct AppState {
    pub relay: Arc<SignalRelay>,
}

/// Build the HTTP router around a relay
pub fn router(relay: Arc<SignalRelay>, max_payload_bytes: usize) -> Router {
    let state = AppState { relay };

    Router::new()
        .route(SignalKind::Traces.path(), post(handle_traces))
        .route(SignalKind::Metrics.path(), post(handle_metrics))
        .route(SignalKind::Logs.path(), post(handle_logs))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(max_payload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Entry point for server mode with a resolved configuration
pub async fn run_with_config(config: RelayConfig) -> Result<()> {
    init_tracing(&config.server);

    let relay = SignalRelay::new(&config, init_sink()).context("Failed to build forwarder")?;

    for kind in SignalKind::ALL {
        match relay.forwarder().target_url(kind) {
            Some(url) => info!(signal = %kind, upstream = %url, "Forwarding enabled"),
            None => info!(signal = %kind, "Forwarding disabled"),
        }
    }
    info!(
        "Max payload size set to {} bytes ({} bytes inflated), upstream timeout {}s",
        config.request.max_payload_bytes,
        config.request.max_decompressed_bytes,
        config.forwarding.timeout_secs
    );

    let app = router(Arc::new(relay), config.request.max_payload_bytes);

    let addr = &config.server.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("OTLP HTTP relay listening on http://{}", addr);
    info!("Routes:");
    for kind in SignalKind::ALL {
        info!("  POST http://{}{} - OTLP {} export", addr, kind.path(), kind);
    }
    info!("  GET  http://{}/health - Health check", addr);
    info!("Press Ctrl+C or send SIGTERM to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}
