use super::{normalize_url, LogFormat, RelayConfig};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "OTLP_PROXY_";

/// Abstraction over environment-variable lookups so tests can supply
/// their own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the OTLP_PROXY_ prefix
    /// Used for the short names (PORT, FORWARD_TRACES_URL, ...)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the relay config.
///
/// The unprefixed names are read first so that an `OTLP_PROXY_` variable
/// always wins when both are set.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RelayConfig, env: &E) -> Result<()> {
    // Listen port / address
    if let Some(port) = get_raw_env_port(env, "PORT")? {
        config.server.set_port(port);
    }
    if let Some(addr) = get_env_string(env, "LISTEN_ADDR") {
        config.server.listen_addr = addr;
    }
    if let Some(port) = get_env_port(env, "PORT")? {
        config.server.set_port(port);
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.server.log_level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.server.log_format = format
            .parse::<LogFormat>()
            .context("Invalid OTLP_PROXY_LOG_FORMAT value")?;
    }

    // Upstream collectors. Set-but-empty disables forwarding for the signal.
    for (key, slot) in [
        ("FORWARD_TRACES_URL", &mut config.forwarding.traces_url),
        ("FORWARD_METRICS_URL", &mut config.forwarding.metrics_url),
        ("FORWARD_LOGS_URL", &mut config.forwarding.logs_url),
    ] {
        if let Some(url) = env.get_raw(key) {
            *slot = normalize_url(Some(url));
        }
        if let Some(url) = env.get(key) {
            *slot = normalize_url(Some(url));
        }
    }
    if let Some(val) = get_env_u64(env, "FORWARD_TIMEOUT_SECS")? {
        config.forwarding.timeout_secs = val;
    }

    // Request configuration
    if let Some(val) = get_env_usize(env, "MAX_PAYLOAD_BYTES")? {
        config.request.max_payload_bytes = val;
    }
    if let Some(val) = get_env_usize(env, "MAX_DECOMPRESSED_BYTES")? {
        config.request.max_decompressed_bytes = val;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn get_env_port<E: EnvSource>(env: &E, key: &str) -> Result<Option<u16>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<u16>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_raw_env_port<E: EnvSource>(env: &E, key: &str) -> Result<Option<u16>> {
    match env.get_raw(key).map(|v| v.trim().to_string()) {
        Some(val) if !val.is_empty() => {
            let parsed = val
                .parse::<u16>()
                .map_err(|e| anyhow!("Failed to parse {}: {}", key, e))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_UPSTREAM_URL;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapEnv(HashMap<String, String>);

    impl MapEnv {
        fn with(mut self, key: &str, value: &str) -> Self {
            self.0.insert(key.to_string(), value.to_string());
            self
        }
    }

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(&format!("{}{}", ENV_PREFIX, key)).cloned()
        }

        fn get_raw(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    #[test]
    fn test_no_env_keeps_defaults() {
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config, &MapEnv::default()).unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_legacy_names() {
        let env = MapEnv::default()
            .with("PORT", " 5318 ")
            .with("FORWARD_TRACES_URL", "http://tempo:4318\n")
            .with("FORWARD_METRICS_URL", "");
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.server.listen_addr, "0.0.0.0:5318");
        assert_eq!(
            config.forwarding.traces_url.as_deref(),
            Some("http://tempo:4318")
        );
        assert_eq!(config.forwarding.metrics_url, None);
        assert_eq!(
            config.forwarding.logs_url.as_deref(),
            Some(DEFAULT_UPSTREAM_URL)
        );
    }

    #[test]
    fn test_prefixed_names_win() {
        let env = MapEnv::default()
            .with("PORT", "5318")
            .with("OTLP_PROXY_PORT", "6318")
            .with("FORWARD_LOGS_URL", "http://loki:4318")
            .with("OTLP_PROXY_FORWARD_LOGS_URL", "  ")
            .with("OTLP_PROXY_FORWARD_TIMEOUT_SECS", "5")
            .with("OTLP_PROXY_LOG_FORMAT", "json")
            .with("OTLP_PROXY_MAX_DECOMPRESSED_BYTES", "1048576");
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.server.listen_addr, "0.0.0.0:6318");
        assert_eq!(config.forwarding.logs_url, None);
        assert_eq!(config.forwarding.timeout_secs, 5);
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.request.max_decompressed_bytes, 1024 * 1024);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let env = MapEnv::default().with("PORT", "not-a-port");
        let mut config = RelayConfig::default();
        let err = apply_env_overrides(&mut config, &env).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
