//! app-dispatch server.
//!
//! Serves the static route table from a TOML configuration file through the
//! dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use app_dispatch::config::{load_config, AppConfig};
use app_dispatch::http::shutdown_signal;
use app_dispatch::observability::{logging, metrics};
use app_dispatch::{DispatcherBuilder, HttpServer};

#[derive(Parser, Debug)]
#[command(name = "app-dispatch", version, about = "Serve a configured route table")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("app-dispatch v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dispatcher = Arc::new(DispatcherBuilder::from_config(&config)?.build());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        routes = dispatcher.router().len(),
        request_timeout_secs = config.listener.request_timeout_secs,
        "Listening for connections"
    );

    HttpServer::new(dispatcher, config.listener.clone())
        .run(listener, shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
