//! afkbot: unattended game client.
//!
//! Binds the health endpoint, then connects through the gateway and keeps
//! reconnecting for as long as auto-reconnect is on.
//!
//!   afkbot --config settings.json --port 3000
//!
//! Set AFKBOT_LOG_JSON=1 for JSON logs; RUST_LOG overrides the default filter.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use afkbot::config::{DEFAULT_HEALTH_PORT, Settings};
use afkbot::controller::{Controller, GatewayConnector};
use afkbot::health::{self, BindError};

#[derive(Parser)]
#[command(name = "afkbot", about = "Unattended game client with reconnect and identity rotation")]
struct Args {
    /// Settings file (.json, or .toml)
    #[arg(long, env = "AFKBOT_CONFIG", default_value = "settings.json")]
    config: PathBuf,

    /// Health endpoint port (falls back to settings, then 3000)
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let json_logs = std::env::var("AFKBOT_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "afkbot=info,afkbot_sdk=info".into());
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {info}");
    }));

    let args = Args::parse();
    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    let settings = Arc::new(settings);

    let port = args.port.or(settings.health_port).unwrap_or(DEFAULT_HEALTH_PORT);
    let web = match health::bind(port).await {
        Ok(listener) => {
            tracing::info!("Server listening on port {port}");
            Some(tokio::spawn(health::serve(listener)))
        }
        Err(e @ BindError::PortInUse(_)) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "An unexpected error occurred with the web server");
            None
        }
    };

    let controller = Controller::new(settings, Box::new(GatewayConnector));
    tokio::select! {
        result = controller.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            return Ok(());
        }
    }

    // Halted with auto-reconnect off: stay up for the health checker.
    if let Some(web) = web {
        tokio::select! {
            result = web => result??,
            _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
        }
    }
    Ok(())
}
