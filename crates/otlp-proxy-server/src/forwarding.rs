// Forwarding module - relays OTLP requests to the configured upstream collector
//
// The upstream receives the exact bytes and end-to-end headers the relay
// received. Its status and body come back unmodified, whether or not they
// indicate success.

use axum::http::header::{
    HeaderName, CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HOST, TE, TRAILER,
    TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use otlp_proxy_codec::SignalKind;
use otlp_proxy_config::ForwardingConfig;
use tracing::{debug, warn};

/// Response captured from the upstream collector.
///
/// `body` is kept exactly as received. The client does not decompress, so a
/// compressed reply stays compressed and `content_encoding` describes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardOutcome {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub content_encoding: Option<HeaderValue>,
    pub body: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid upstream URL '{url}' for {signal}: {reason}")]
    InvalidUrl {
        signal: SignalKind,
        url: String,
        reason: String,
    },

    #[error("upstream {url} unreachable: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Forwarder relays original payloads to per-signal upstream endpoints
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    traces_url: Option<String>,
    metrics_url: Option<String>,
    logs_url: Option<String>,
}

impl Forwarder {
    /// Create a new Forwarder from the forwarding configuration
    pub fn new(config: &ForwardingConfig) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ForwardError::Client)?;

        Ok(Self {
            client,
            traces_url: parse_base_url(SignalKind::Traces, config.traces_url.as_deref())?,
            metrics_url: parse_base_url(SignalKind::Metrics, config.metrics_url.as_deref())?,
            logs_url: parse_base_url(SignalKind::Logs, config.logs_url.as_deref())?,
        })
    }

    /// Configured base URL for a signal, `None` when forwarding is disabled
    pub fn upstream_for(&self, signal: SignalKind) -> Option<&str> {
        match signal {
            SignalKind::Traces => self.traces_url.as_deref(),
            SignalKind::Metrics => self.metrics_url.as_deref(),
            SignalKind::Logs => self.logs_url.as_deref(),
        }
    }

    /// Full URL a request for `signal` is posted to
    pub fn target_url(&self, signal: SignalKind) -> Option<String> {
        self.upstream_for(signal)
            .map(|base| format!("{}{}", base, signal.path()))
    }

    /// Forward a request to the upstream configured for `signal`.
    ///
    /// Returns `Ok(None)` without any network activity when forwarding is
    /// disabled for the signal. Non-success upstream responses are returned
    /// as `Ok(Some(..))`; only transport failures are errors.
    pub async fn forward(
        &self,
        signal: SignalKind,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Option<ForwardOutcome>, ForwardError> {
        let Some(url) = self.target_url(signal) else {
            debug!(signal = %signal, "Forwarding disabled, skipping upstream");
            return Ok(None);
        };

        let body_len = body.len();
        let response = self
            .client
            .post(&url)
            .headers(outbound_headers(headers))
            .body(body)
            .send()
            .await
            .map_err(|source| ForwardError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let content_encoding = response.headers().get(CONTENT_ENCODING).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|source| ForwardError::Transport {
                url: url.clone(),
                source,
            })?;

        if status.is_success() {
            debug!(
                url = %url,
                status = %status,
                signal = %signal,
                bytes = body_len,
                "Forwarded request"
            );
        } else {
            warn!(
                url = %url,
                status = %status,
                signal = %signal,
                "Upstream returned non-success status, relaying as-is"
            );
        }

        Ok(Some(ForwardOutcome {
            status,
            content_type,
            content_encoding,
            body,
        }))
    }
}

fn parse_base_url(signal: SignalKind, url: Option<&str>) -> Result<Option<String>, ForwardError> {
    let Some(url) = url else {
        return Ok(None);
    };

    let parsed = reqwest::Url::parse(url).map_err(|e| ForwardError::InvalidUrl {
        signal,
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ForwardError::InvalidUrl {
            signal,
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(Some(url.trim_end_matches('/').to_string()))
}

/// Headers describing the inbound connection rather than the payload.
/// The HTTP client regenerates these for the outbound hop.
fn is_connection_header(name: &HeaderName) -> bool {
    name == HOST
        || name == CONTENT_LENGTH
        || name == TRANSFER_ENCODING
        || name == CONNECTION
        || name == UPGRADE
        || name == TE
        || name == TRAILER
        || name.as_str() == "keep-alive"
        || name.as_str() == "proxy-connection"
}

/// Copy every end-to-end header, keeping repeated values in their original order.
fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if !is_connection_header(name) {
            outbound.append(name.clone(), value.clone());
        }
    }
    outbound
}
