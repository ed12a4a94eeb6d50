mod api;
mod config;
mod core;

use std::sync::Arc;

use anyhow::{Context, Result};
use api::{build_app, AppState};
use config::Config;
use poem::{listener::TcpListener, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::core::HttpUpstream;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    let upstream = HttpUpstream::new(config.upstream_timeout())?;
    let addr = format!("0.0.0.0:{}", config.port);

    info!(
        "serving {} tenants, fallback origin {}",
        config.customers.len(),
        config.fallback_origin
    );

    let state = Arc::new(AppState {
        config,
        upstream: Arc::new(upstream),
    });

    info!("listening on {}", addr);
    Server::new(TcpListener::bind(addr))
        .run_with_graceful_shutdown(
            build_app(state),
            async {
                let _ = tokio::signal::ctrl_c().await;
            },
            None,
        )
        .await
        .context("server stopped")
}
