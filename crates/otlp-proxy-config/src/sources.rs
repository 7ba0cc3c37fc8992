// Configuration source loading.
//
// Priority order:
// 1. Environment variables (OTLP_PROXY_* prefix, then legacy short names)
// 2. Config file path from OTLP_PROXY_CONFIG
// 3. Inline config content from OTLP_PROXY_CONFIG_CONTENT
// 4. Default config files (./otlp-proxy.toml, ./.otlp-proxy.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RelayConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_FILES: &[&str] = &["./otlp-proxy.toml", "./.otlp-proxy.toml"];

/// Load configuration from the given environment source.
pub fn load_config<E: EnvSource>(env: &E) -> Result<RelayConfig> {
    let mut config = load_from_file(env)?.unwrap_or_default();
    env_overrides::apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file<E: EnvSource>(env: &E) -> Result<Option<RelayConfig>> {
    if let Some(path) = env.get("CONFIG") {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Some(content) = env.get("CONFIG_CONTENT") {
        let config = RelayConfig::from_toml(&content)
            .context("Failed to parse inline config from OTLP_PROXY_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_CONFIG_FILES {
        let path = Path::new(path);
        if path.exists() {
            return read_config_file(path).map(Some);
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
/// Environment overrides are still applied on top of the file.
pub fn load_from_file_path<E: EnvSource>(path: impl AsRef<Path>, env: &E) -> Result<RelayConfig> {
    let mut config = read_config_file(path.as_ref())?;
    env_overrides::apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<RelayConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    RelayConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Reads the process environment.
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    struct MapEnv(HashMap<&'static str, String>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(format!("{}{}", ENV_PREFIX, key).as_str()).cloned()
        }

        fn get_raw(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    #[test]
    fn inline_content_then_env() {
        let env = MapEnv(HashMap::from([
            (
                "OTLP_PROXY_CONFIG_CONTENT",
                "[server]\nlisten_addr = \"127.0.0.1:7000\"\n".to_string(),
            ),
            ("FORWARD_METRICS_URL", String::new()),
        ]));

        let config = load_config(&env).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:7000");
        assert_eq!(config.forwarding.metrics_url, None);
        assert!(config.forwarding.traces_url.is_some());
    }

    #[test]
    fn explicit_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[forwarding]\ntraces_url = \"https://collector.example.com\"\ntimeout_secs = 3"
        )
        .unwrap();

        let env = MapEnv(HashMap::from([("PORT", "4400".to_string())]));
        let config = load_from_file_path(file.path(), &env).unwrap();

        assert_eq!(
            config.forwarding.traces_url.as_deref(),
            Some("https://collector.example.com")
        );
        assert_eq!(config.forwarding.timeout_secs, 3);
        assert_eq!(config.server.listen_addr, "0.0.0.0:4400");
    }

    #[test]
    fn missing_file_is_an_error() {
        let env = MapEnv(HashMap::new());
        let err = load_from_file_path("/nonexistent/otlp-proxy.toml", &env).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let env = MapEnv(HashMap::from([(
            "OTLP_PROXY_CONFIG_CONTENT",
            "[server\n".to_string(),
        )]));
        assert!(load_config(&env).is_err());
    }
}
