//! mused - Muse AI chat server daemon

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mused::{Config, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mused", about = "Muse AI chat server daemon")]
struct Args {
    /// Bind address (host:port)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Data directory for stored images
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Configuration file (default: mused.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mused=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
