use anyhow::{Context, Result};
use clap::Parser;
use colorclock_server::store::{MemoryStore, SqliteStore, Store};
use colorclock_server::{Api, Coordinator, ServerConfig};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Path to SQLite database for round state, bets and results (in-memory when omitted).
    #[arg(long)]
    database_path: Option<PathBuf>,

    /// Countdown window in seconds.
    #[arg(long)]
    window_seconds: Option<u32>,

    /// Milliseconds between ticks.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Start ticking at boot.
    #[arg(long, default_value_t = false)]
    start_clock: bool,

    /// Max HTTP request body size in bytes (0 disables limit).
    #[arg(long)]
    http_body_limit_bytes: Option<usize>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_config(args: &Args) -> Result<ServerConfig> {
    let defaults = ServerConfig::default();
    let config = ServerConfig {
        window_seconds: args.window_seconds.unwrap_or(defaults.window_seconds),
        tick_ms: args.tick_ms.unwrap_or(defaults.tick_ms),
        database_path: args.database_path.clone(),
        start_clock: args.start_clock,
        http_body_limit_bytes: match args.http_body_limit_bytes {
            Some(0) => None,
            Some(value) => Some(value),
            None => defaults.http_body_limit_bytes,
        },
    };
    config.validate().map_err(|err| anyhow::anyhow!(err))?;
    Ok(config)
}

fn open_store(config: &ServerConfig) -> Result<Arc<dyn Store>> {
    match &config.database_path {
        Some(path) => {
            let store = SqliteStore::open(path)
                .with_context(|| format!("failed to open database {}", path.display()))?;
            info!(path = %path.display(), "using sqlite store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("no --database-path set; round state will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = build_config(&args)?;
    info!(?config, "loaded config");
    let store = open_store(&config)?;
    let start_clock = config.start_clock;
    let coordinator =
        Arc::new(Coordinator::new(store, config).context("failed to restore round state")?);
    if start_clock {
        coordinator.start_clock().await;
    }

    let app = Api::new(coordinator.clone()).router();
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(?err, "failed to listen for shutdown signal");
            }
        })
        .await
        .context("axum server error")?;

    coordinator.stop_clock().await;
    info!(state = ?coordinator.timer_state(), "shut down");
    Ok(())
}
