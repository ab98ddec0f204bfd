use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roxy_gateway::{GatewayConfig, build_router, build_state};

/// Local assistant gateway: routes commands to tools and retrieval.
#[derive(Debug, Parser)]
#[command(name = "roxy-gateway", version)]
struct Cli {
    /// Load environment variables from this file before reading config.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Override the bind address from the environment.
    #[arg(long)]
    bind: Option<String>,
}

/// Interval between semantic cache purge sweeps.
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("loading env file {}", path.display()))?;
        }
        None => {
            // A missing .env is fine; a malformed one is not.
            if let Err(e) = dotenvy::dotenv()
                && !e.not_found()
            {
                return Err(e).context("loading .env");
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = GatewayConfig::from_env()?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    let bind_addr = config.bind_addr.clone();

    let state = build_state(config).await?;
    info!("startup self-checks passed");

    // Expired cache entries are also dropped lazily on lookup; the sweep
    // keeps the collection from accumulating entries nobody asks for again.
    let purge_pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CACHE_PURGE_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            purge_pipeline.purge_cache().await;
        }
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!("listening on {bind_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving")?;

    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("could not install ctrl-c handler: {e}");
        // Without a signal handler the future must still resolve somehow;
        // park forever and rely on the process being killed.
        futures::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
