use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::Level;

use a2a_engine::WeatherLookup;
use a2a_server::ServerConfig;
use a2a_telemetry::{init_telemetry, TelemetryConfig};

/// A2A streaming agent server.
#[derive(Debug, Parser)]
#[command(name = "a2a", version)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "A2A_HOST")]
    host: Option<String>,

    /// Port to listen on (0 picks a free one).
    #[arg(long, env = "A2A_PORT")]
    port: Option<u16>,

    /// Pause between streamed task stages, in milliseconds.
    #[arg(long, env = "A2A_STREAM_DELAY_MS")]
    stream_delay_ms: Option<u64>,

    /// Fail a stream stalled for this many seconds (0 disables).
    #[arg(long, env = "A2A_STREAM_IDLE_TIMEOUT_SECS")]
    stream_idle_timeout_secs: Option<u64>,

    /// Expired-session sweep interval in seconds (0 disables).
    #[arg(long, env = "A2A_CLEANUP_INTERVAL_SECS")]
    cleanup_interval_secs: Option<u64>,

    /// SSE keep-alive interval in seconds.
    #[arg(long, env = "A2A_KEEP_ALIVE_SECS")]
    keep_alive_secs: Option<u64>,

    /// Base log level. RUST_LOG takes precedence.
    #[arg(long, env = "A2A_LOG_LEVEL", default_value = "info")]
    log_level: Level,

    /// Per-module override, e.g. `a2a_server=debug`. Repeatable.
    #[arg(long = "log-module", value_parser = parse_module_level)]
    log_modules: Vec<(String, Level)>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "A2A_LOG_JSON")]
    json_logs: bool,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: self.host.clone().unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            stream_delay_ms: self.stream_delay_ms.unwrap_or(defaults.stream_delay_ms),
            stream_idle_timeout_secs: self
                .stream_idle_timeout_secs
                .unwrap_or(defaults.stream_idle_timeout_secs),
            cleanup_interval_secs: self.cleanup_interval_secs.unwrap_or(defaults.cleanup_interval_secs),
            keep_alive_secs: self.keep_alive_secs.unwrap_or(defaults.keep_alive_secs),
        }
    }
}

fn parse_module_level(raw: &str) -> Result<(String, Level), String> {
    let (module, level) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected MODULE=LEVEL, got `{raw}`"))?;
    let level = level.parse::<Level>().map_err(|e| e.to_string())?;
    Ok((module.to_string(), level))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _telemetry = init_telemetry(TelemetryConfig {
        log_level: cli.log_level,
        module_levels: cli.log_modules.clone(),
        json: cli.json_logs,
    });

    let config = cli.server_config();
    tracing::info!(?config, "starting A2A server");

    let state = a2a_server::build_state(&config, Arc::new(WeatherLookup::new()));
    let handle = a2a_server::start(config, state)
        .await
        .context("failed to start server")?;

    tracing::info!(port = handle.port, "A2A server ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    handle.shutdown().await;
    Ok(())
}
