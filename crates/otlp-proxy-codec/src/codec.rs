//! Binary decoder for OTLP export requests.
//!
//! Decoding works on a borrowed view of the request body. When the body is
//! compressed, a private inflated copy is decoded instead; the caller's
//! buffer is never modified, so it can still be forwarded byte-for-byte.

use crate::error::DecodeError;
use crate::signal::{InputFormat, SignalKind};
use flate2::read::GzDecoder;
use opentelemetry_proto::tonic::collector::{
    logs::v1::ExportLogsServiceRequest, metrics::v1::ExportMetricsServiceRequest,
    trace::v1::ExportTraceServiceRequest,
};
use prost::Message;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::io::Read;

/// A decoded OTLP export request for one signal kind.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBatch {
    Traces(ExportTraceServiceRequest),
    Metrics(ExportMetricsServiceRequest),
    Logs(ExportLogsServiceRequest),
}

impl DecodedBatch {
    pub fn kind(&self) -> SignalKind {
        match self {
            DecodedBatch::Traces(_) => SignalKind::Traces,
            DecodedBatch::Metrics(_) => SignalKind::Metrics,
            DecodedBatch::Logs(_) => SignalKind::Logs,
        }
    }

    /// Number of resource-level entries in the batch.
    pub fn resource_count(&self) -> usize {
        match self {
            DecodedBatch::Traces(req) => req.resource_spans.len(),
            DecodedBatch::Metrics(req) => req.resource_metrics.len(),
            DecodedBatch::Logs(req) => req.resource_logs.len(),
        }
    }

    /// Number of spans, metrics, or log records across all scopes.
    pub fn record_count(&self) -> usize {
        match self {
            DecodedBatch::Traces(req) => req
                .resource_spans
                .iter()
                .flat_map(|rs| &rs.scope_spans)
                .map(|ss| ss.spans.len())
                .sum(),
            DecodedBatch::Metrics(req) => req
                .resource_metrics
                .iter()
                .flat_map(|rm| &rm.scope_metrics)
                .map(|sm| sm.metrics.len())
                .sum(),
            DecodedBatch::Logs(req) => req
                .resource_logs
                .iter()
                .flat_map(|rl| &rl.scope_logs)
                .map(|sl| sl.log_records.len())
                .sum(),
        }
    }
}

/// Decode `body` as the export request schema of `kind`.
///
/// `content_encoding` is the raw `Content-Encoding` header value, if any.
/// A compressed body that inflates past `max_decompressed` bytes is
/// rejected with [`DecodeError::TooLarge`].
pub fn decode(
    kind: SignalKind,
    body: &[u8],
    format: InputFormat,
    content_encoding: Option<&str>,
    max_decompressed: usize,
) -> Result<DecodedBatch, DecodeError> {
    let payload = decompress(body, content_encoding, max_decompressed)?;

    let batch = match kind {
        SignalKind::Traces => DecodedBatch::Traces(decode_message(&payload, format)?),
        SignalKind::Metrics => DecodedBatch::Metrics(decode_message(&payload, format)?),
        SignalKind::Logs => DecodedBatch::Logs(decode_message(&payload, format)?),
    };

    Ok(batch)
}

fn decode_message<T>(payload: &[u8], format: InputFormat) -> Result<T, DecodeError>
where
    T: Message + Default + DeserializeOwned,
{
    match format {
        InputFormat::Protobuf => Ok(T::decode(payload)?),
        InputFormat::Json => Ok(serde_json::from_slice(payload)?),
    }
}

fn decompress<'a>(
    body: &'a [u8],
    content_encoding: Option<&str>,
    limit: usize,
) -> Result<Cow<'a, [u8]>, DecodeError> {
    let encoding = content_encoding.map(|e| e.trim().to_ascii_lowercase());

    match encoding.as_deref() {
        None | Some("") | Some("identity") => Ok(Cow::Borrowed(body)),
        Some("gzip") | Some("x-gzip") => {
            // One byte past the limit is enough to tell an oversized payload apart
            let mut inflated = Vec::new();
            GzDecoder::new(body)
                .take(limit as u64 + 1)
                .read_to_end(&mut inflated)
                .map_err(|source| DecodeError::Decompress {
                    encoding: "gzip".to_string(),
                    source,
                })?;
            if inflated.len() > limit {
                return Err(DecodeError::TooLarge {
                    encoding: "gzip".to_string(),
                    limit,
                });
            }
            tracing::trace!(
                compressed = body.len(),
                inflated = inflated.len(),
                "Inflated gzip payload for decoding"
            );
            Ok(Cow::Owned(inflated))
        }
        Some(other) => Err(DecodeError::UnsupportedEncoding(other.to_string())),
    }
}
