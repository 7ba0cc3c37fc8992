// HTTP request handlers for server mode
//
// Implements the OTLP export endpoints and the health check

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use otlp_proxy_codec::SignalKind;
use serde_json::json;

use crate::relay::{ExportRequest, RelayResponse};
use crate::AppState;

/// POST /v1/traces - OTLP trace export endpoint
pub(crate) async fn handle_traces(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> RelayResponse {
    handle_signal(SignalKind::Traces, &state, headers, body).await
}

/// POST /v1/metrics - OTLP metrics export endpoint
pub(crate) async fn handle_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> RelayResponse {
    handle_signal(SignalKind::Metrics, &state, headers, body).await
}

/// POST /v1/logs - OTLP log export endpoint
pub(crate) async fn handle_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> RelayResponse {
    handle_signal(SignalKind::Logs, &state, headers, body).await
}

/// GET /health - Basic health check
pub(crate) async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

async fn handle_signal(
    signal: SignalKind,
    state: &AppState,
    headers: HeaderMap,
    body: Bytes,
) -> RelayResponse {
    state
        .relay
        .handle(ExportRequest::new(signal, headers, body))
        .await
}
