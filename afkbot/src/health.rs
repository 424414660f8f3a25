//! Liveness endpoint for hosting platforms that expect an HTTP port.

use std::io;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;

pub const RUNNING: &str = "Bot is running!";

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("port {0} is already in use. Another instance of the bot may be running.")]
    PortInUse(u16),
    #[error("can't bind health endpoint on port {port}: {source}")]
    Other {
        port: u16,
        #[source]
        source: io::Error,
    },
}

pub fn router() -> Router {
    Router::new().route("/", get(|| async { RUNNING }))
}

/// Bind on all interfaces. A port conflict is reported separately because
/// it usually means a second copy of the bot is running.
pub async fn bind(port: u16) -> Result<TcpListener, BindError> {
    TcpListener::bind(("0.0.0.0", port)).await.map_err(|source| {
        if source.kind() == io::ErrorKind::AddrInUse {
            BindError::PortInUse(port)
        } else {
            BindError::Other { port, source }
        }
    })
}

pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    axum::serve(listener, router()).await?;
    Ok(())
}
