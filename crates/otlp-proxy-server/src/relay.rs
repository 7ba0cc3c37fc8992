// Per-request pipeline shared by all three signal endpoints
//
// decode -> render -> forward -> respond. Any local failure ends the request
// with a fixed 500; upstream replies are relayed unchanged.

use axum::body::Body;
use axum::http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use metrics::{counter, histogram};
use otlp_proxy_codec::{
    decode, render_to, DecodeError, DocumentSink, InputFormat, RenderError, SignalKind,
};
use otlp_proxy_config::{RelayConfig, RequestConfig};
use std::sync::Arc;
use tracing::{debug, error};

use crate::forwarding::{ForwardError, ForwardOutcome, Forwarder};

/// Body returned to the caller for every locally-originated failure.
pub const FAILURE_BODY: &str = "Error processing data";

/// One inbound export request.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub kind: SignalKind,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ExportRequest {
    pub fn new(kind: SignalKind, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            kind,
            headers,
            body,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("forward failed: {0}")]
    ForwardTransport(#[from] ForwardError),
}

impl RelayError {
    /// Pipeline stage the error originated in
    pub fn stage(&self) -> &'static str {
        match self {
            RelayError::Decode(_) => "decode",
            RelayError::Render(_) => "render",
            RelayError::ForwardTransport(_) => "forward",
        }
    }
}

/// Response handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub content_encoding: Option<HeaderValue>,
    pub body: Bytes,
}

impl RelayResponse {
    /// 200 with no body, used when forwarding is disabled.
    pub fn empty_ok() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: None,
            content_encoding: None,
            body: Bytes::new(),
        }
    }

    pub fn failure() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            content_type: Some(HeaderValue::from_static("text/plain; charset=utf-8")),
            content_encoding: None,
            body: Bytes::from_static(FAILURE_BODY.as_bytes()),
        }
    }
}

impl From<ForwardOutcome> for RelayResponse {
    fn from(outcome: ForwardOutcome) -> Self {
        Self {
            status: outcome.status,
            content_type: outcome.content_type,
            content_encoding: outcome.content_encoding,
            body: outcome.body,
        }
    }
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        if let Some(content_type) = self.content_type {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        if let Some(content_encoding) = self.content_encoding {
            response
                .headers_mut()
                .insert(CONTENT_ENCODING, content_encoding);
        }
        response
    }
}

/// Decodes, renders and forwards export requests.
pub struct SignalRelay {
    forwarder: Forwarder,
    sink: Arc<dyn DocumentSink>,
    max_decompressed_bytes: usize,
}

impl SignalRelay {
    pub fn new(config: &RelayConfig, sink: Arc<dyn DocumentSink>) -> Result<Self, ForwardError> {
        let relay = Self::with_forwarder(Forwarder::new(&config.forwarding)?, sink);
        Ok(relay.max_decompressed_bytes(config.request.max_decompressed_bytes))
    }

    pub fn with_forwarder(forwarder: Forwarder, sink: Arc<dyn DocumentSink>) -> Self {
        Self {
            forwarder,
            sink,
            max_decompressed_bytes: RequestConfig::default().max_decompressed_bytes,
        }
    }

    /// Limit on the inflated size of compressed request bodies
    pub fn max_decompressed_bytes(mut self, limit: usize) -> Self {
        self.max_decompressed_bytes = limit;
        self
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Run one request through the pipeline. Never fails; local errors are
    /// logged and mapped to the fixed failure response.
    pub async fn handle(&self, request: ExportRequest) -> RelayResponse {
        let signal = request.kind;
        counter!("otlp.relay.requests", 1, "signal" => signal.as_str());
        histogram!(
            "otlp.relay.bytes",
            request.body.len() as f64,
            "signal" => signal.as_str()
        );

        match self.process(&request).await {
            Ok(Some(outcome)) => {
                counter!(
                    "otlp.relay.forwarded",
                    1,
                    "signal" => signal.as_str(),
                    "status" => outcome.status.as_u16().to_string()
                );
                outcome.into()
            }
            Ok(None) => RelayResponse::empty_ok(),
            Err(err) => {
                error!(
                    signal = %signal,
                    stage = err.stage(),
                    error = %err,
                    "Failed to relay OTLP request"
                );
                counter!(
                    "otlp.relay.failures",
                    1,
                    "signal" => signal.as_str(),
                    "stage" => err.stage()
                );
                RelayResponse::failure()
            }
        }
    }

    /// Decode and render `request`, then forward its original bytes.
    pub async fn process(
        &self,
        request: &ExportRequest,
    ) -> Result<Option<ForwardOutcome>, RelayError> {
        let format = InputFormat::from_content_type(request.content_type());
        let batch = decode(
            request.kind,
            &request.body,
            format,
            request.content_encoding(),
            self.max_decompressed_bytes,
        )?;

        debug!(
            signal = %request.kind,
            bytes = request.body.len(),
            format = ?format,
            resources = batch.resource_count(),
            records = batch.record_count(),
            "Decoded OTLP request"
        );

        render_to(&batch, self.sink.as_ref())?;

        let outcome = self
            .forwarder
            .forward(request.kind, &request.headers, request.body.clone())
            .await?;

        Ok(outcome)
    }
}
