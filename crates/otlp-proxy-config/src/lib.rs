// otlp-proxy-config - Relay configuration
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority, OTLP_PROXY_* before legacy names)
// 2. Config file path from OTLP_PROXY_CONFIG env var
// 3. Config file contents from OTLP_PROXY_CONFIG_CONTENT env var
// 4. Default config file locations (./otlp-proxy.toml, ./.otlp-proxy.toml)
// 5. Built-in defaults (lowest priority)
//
// The resulting RelayConfig is built once at startup and never mutated after.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};
pub use sources::{load_config, load_from_file_path, StdEnvSource};

/// Collector address used when no upstream is configured explicitly.
pub const DEFAULT_UPSTREAM_URL: &str = "http://otel-collector:4318";

/// Main relay configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub forwarding: ForwardingConfig,

    #[serde(default)]
    pub request: RequestConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4318".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Replace the port of the listen address, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .listen_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .filter(|host| !host.is_empty())
            .unwrap_or("0.0.0.0");
        self.listen_addr = format!("{}:{}", host, port);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

/// Upstream collectors, one optional base URL per signal.
///
/// `None` disables forwarding for that signal: requests are still decoded and
/// rendered, and the caller receives `200` with an empty body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traces_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            traces_url: Some(DEFAULT_UPSTREAM_URL.to_string()),
            metrics_url: Some(DEFAULT_UPSTREAM_URL.to_string()),
            logs_url: Some(DEFAULT_UPSTREAM_URL.to_string()),
            timeout_secs: 30,
        }
    }
}

impl ForwardingConfig {
    /// Forwarding disabled for every signal
    pub fn disabled() -> Self {
        Self {
            traces_url: None,
            metrics_url: None,
            logs_url: None,
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Trim whitespace and turn empty URLs into `None`.
    pub(crate) fn normalize(&mut self) {
        for url in [
            &mut self.traces_url,
            &mut self.metrics_url,
            &mut self.logs_url,
        ] {
            *url = normalize_url(url.take());
        }
    }
}

pub(crate) fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

/// Request handling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub max_payload_bytes: usize,
    /// Cap on the inflated size of a compressed request body
    pub max_decompressed_bytes: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 8 * 1024 * 1024,
            max_decompressed_bytes: 64 * 1024 * 1024,
        }
    }
}

impl RelayConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config(&StdEnvSource)
    }

    /// Parse a TOML document. Missing sections fall back to defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: RelayConfig = toml::from_str(content)?;
        config.forwarding.normalize();
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}
