// Initialization utilities for server mode
//
// Logging/tracing setup and the output sink

use otlp_proxy_codec::{DocumentSink, StdoutSink};
use otlp_proxy_config::{LogFormat, ServerConfig};
use std::sync::Arc;

/// Initialize tracing/logging from ServerConfig
///
/// Logs go to stderr; stdout carries only rendered documents.
pub(crate) fn init_tracing(server: &ServerConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Parse log level from config
    let env_filter =
        EnvFilter::try_new(&server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // try_init: a subscriber may already be installed when embedded
    let result = match server.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already initialized: {e}");
    }
}

/// Process-wide document sink
pub(crate) fn init_sink() -> Arc<dyn DocumentSink> {
    Arc::new(StdoutSink)
}
