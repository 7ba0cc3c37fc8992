/// The three OTLP signal kinds the relay accepts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SignalKind {
    Traces,
    Metrics,
    Logs,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [SignalKind::Traces, SignalKind::Metrics, SignalKind::Logs];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Traces => "traces",
            SignalKind::Metrics => "metrics",
            SignalKind::Logs => "logs",
        }
    }

    /// OTLP/HTTP path for this signal, used both for routing and forwarding.
    pub fn path(&self) -> &'static str {
        match self {
            SignalKind::Traces => "/v1/traces",
            SignalKind::Metrics => "/v1/metrics",
            SignalKind::Logs => "/v1/logs",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported encodings for OTLP payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Binary protobuf (default)
    Protobuf,
    /// OTLP/JSON
    Json,
}

impl InputFormat {
    /// Detect format from Content-Type header.
    ///
    /// Defaults to Protobuf if header is missing or unrecognized.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.to_ascii_lowercase().contains("application/json") => Self::Json,
            _ => Self::Protobuf,
        }
    }
}
