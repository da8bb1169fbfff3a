// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  hark demo server
//
//  HTTP:      axum app with every exchange logged by HarkLayer
//  Broadcast: optional WebSocket push server for browser consoles
//  Config:    YAML + HARK_* env overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

mod routes;

use anyhow::Context;
use clap::Parser;
use hark_core::HarkConfig;
use hark_middleware::HarkLayer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "hark-demo", version, about = "Demo server for hark exchange logging")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address the demo app listens on
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// File served by `GET /readme`
    #[arg(long, default_value = "README.md")]
    readme: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "hark demo starting");

    // ── Config ──
    let config = match &cli.config {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "Loading config file");
            HarkConfig::load(path)?
        }
        Some(path) => {
            info!(path = %path.display(), "Config file not found, using defaults");
            HarkConfig::default()
        }
        None => HarkConfig::default(),
    };

    let layer = HarkLayer::from_config(&config)?;
    info!(
        sink = ?layer.sink(),
        timeout_ms = %layer.options().timeout_ms(),
        multiline = layer.options().multiline,
        "Exchange logging configured"
    );

    // ── Broadcast server ──
    if let Some(broadcaster) = layer.broadcaster() {
        let addr: SocketAddr = config
            .broadcast_addr
            .parse()
            .with_context(|| format!("invalid broadcast_addr {:?}", config.broadcast_addr))?;
        tokio::spawn(async move {
            if let Err(e) = hark_broadcast::serve(addr, broadcaster).await {
                error!(error = %e, "Broadcast server failed");
            }
        });
    }

    // ── HTTP ──
    let app = layer.apply(routes::demo_routes(cli.readme));
    let listener = tokio::net::TcpListener::bind(cli.addr)
        .await
        .with_context(|| format!("failed to bind {}", cli.addr))?;
    info!(addr = %cli.addr, "hark demo is ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("hark demo stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received, stopping...");
}
