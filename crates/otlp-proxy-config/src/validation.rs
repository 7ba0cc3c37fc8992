// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RelayConfig) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_forwarding_config(&config.forwarding)?;
    validate_request_config(&config.request)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.listen_addr.is_empty() {
        bail!("server.listen_addr must not be empty");
    }

    match config.listen_addr.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => Ok(()),
        _ => bail!("server.listen_addr must be in format 'host:port'"),
    }
}

fn validate_forwarding_config(config: &ForwardingConfig) -> Result<()> {
    for (name, url) in [
        ("traces_url", &config.traces_url),
        ("metrics_url", &config.metrics_url),
        ("logs_url", &config.logs_url),
    ] {
        if let Some(url) = url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!(
                    "forwarding.{} must start with http:// or https:// (got '{}')",
                    name,
                    url
                );
            }
        }
    }

    if config.timeout_secs == 0 {
        bail!("forwarding.timeout_secs must be greater than 0");
    }

    Ok(())
}

fn validate_request_config(config: &RequestConfig) -> Result<()> {
    if config.max_payload_bytes == 0 {
        bail!("request.max_payload_bytes must be greater than 0");
    }
    if config.max_decompressed_bytes == 0 {
        bail!("request.max_decompressed_bytes must be greater than 0");
    }

    // Warn about very large payloads
    if config.max_payload_bytes > 100 * 1024 * 1024 {
        // 100 MB
        warn!(
            max_payload_bytes = config.max_payload_bytes,
            "request.max_payload_bytes is very large; may cause issues"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_defaults() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_server_config() {
        let missing_port = ServerConfig {
            listen_addr: "localhost".to_string(),
            ..Default::default()
        };
        assert!(validate_server_config(&missing_port).is_err());

        let ipv6 = ServerConfig {
            listen_addr: "[::1]:4318".to_string(),
            ..Default::default()
        };
        assert!(validate_server_config(&ipv6).is_ok());
    }

    #[test]
    fn test_validate_forwarding_config() {
        assert!(validate_forwarding_config(&ForwardingConfig::disabled()).is_ok());

        let bad_scheme = ForwardingConfig {
            logs_url: Some("otel-collector:4318".to_string()),
            ..Default::default()
        };
        let err = validate_forwarding_config(&bad_scheme).unwrap_err();
        assert!(err.to_string().contains("forwarding.logs_url"));

        let zero_timeout = ForwardingConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(validate_forwarding_config(&zero_timeout).is_err());
    }

    #[test]
    fn test_validate_request_config() {
        let no_inflate = RequestConfig {
            max_decompressed_bytes: 0,
            ..Default::default()
        };
        let err = validate_request_config(&no_inflate).unwrap_err();
        assert!(err.to_string().contains("max_decompressed_bytes"));
    }
}
