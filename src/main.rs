use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use cos_agent_sdk::agent::{PongServer, StreamPongServer};
use cos_agent_sdk::config::{AUTH_ENV, DEFAULT_SERVER, SERVER_ENV};
use cos_agent_sdk::logging::{self, LogFormat};
use cos_agent_sdk::{Runtime, RuntimeConfig};

/// Example CoS agent process serving `server` and `stream_server`
#[derive(Debug, Parser)]
#[command(name = "cos-agent", version, about)]
struct Args {
    /// The base URL of the broker
    #[arg(long, env = SERVER_ENV, default_value = DEFAULT_SERVER)]
    server: String,

    /// Authorization token
    #[arg(long, env = AUTH_ENV, default_value = "", hide_env_values = true)]
    auth: String,

    /// TCP connect timeout in seconds
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_logging(args.log_format)?;

    let mut config = RuntimeConfig::new(args.server).with_auth(args.auth);
    if let Some(secs) = args.connect_timeout {
        config = config.with_connect_timeout(secs);
    }

    tracing::info!(server = %config.base_url(), "=== CoS Agent Starting ===");

    let runtime = Runtime::from_config(&config).context("Failed to create runtime")?;

    runtime
        .register("server", || PongServer, "The Pong Server.")
        .await
        .context("Failed to register server")?;
    runtime
        .register(
            "stream_server",
            || StreamPongServer::new().with_delay(Duration::from_millis(600)),
            "The Stream Pong Server.",
        )
        .await
        .context("Failed to register stream_server")?;

    tracing::info!(agents = ?runtime.registered_names().await, "Agents registered");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down");
    runtime.shutdown().await;

    Ok(())
}
