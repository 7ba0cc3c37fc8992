use anyhow::{Context, Result};
use clap::Parser;
use otlp_proxy_config::{load_from_file_path, LogFormat, RelayConfig, StdEnvSource};
use std::path::PathBuf;

/// OTLP/HTTP relay that prints every export as YAML and forwards it upstream
#[derive(Parser)]
#[command(name = "otlp-proxy")]
#[command(version)]
#[command(about = "OTLP/HTTP relay that prints every export as YAML and forwards it upstream", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP listen port (overrides config file and environment)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(&cli)?;

    // Build tokio runtime and run async server
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(otlp_proxy_server::run_with_config(config))
}

fn resolve_config(cli: &Cli) -> Result<RelayConfig> {
    let mut config = if let Some(config_path) = &cli.config {
        load_from_file_path(config_path, &StdEnvSource)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RelayConfig::load().context("Failed to load configuration")?
    };

    apply_cli_overrides(&mut config, cli);

    config
        .validate()
        .context("Invalid configuration after CLI overrides")?;

    Ok(config)
}

fn apply_cli_overrides(config: &mut RelayConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        config.server.set_port(port);
    }

    if let Some(level) = &cli.log_level {
        config.server.log_level = level.clone();
    }

    if let Some(format) = cli.log_format {
        config.server.log_format = format;
    }
}
