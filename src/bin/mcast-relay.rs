//! Multicast Relay Application
//!
//! Serves `GET /<prefix>/<group>:<port>` by joining the group and streaming
//! the RTP payloads back over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcast_relay::{config::AppConfig, http::HttpServer, relay::Relay};

#[derive(Parser, Debug)]
#[command(name = "mcast-relay", version, about = "Relay RTP multicast streams over HTTP")]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to join groups on, by name or IPv4 address
    #[arg(short, long)]
    interface: Option<String>,

    /// First-packet timeout, e.g. 5s or 1500ms
    #[arg(short, long)]
    timeout: Option<String>,

    /// HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// HTTP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Allow cross-origin requests
    #[arg(long)]
    cors: bool,

    /// Write the effective config to the config path and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(interface) = args.interface {
        config.relay.interface = interface;
    }
    if let Some(timeout) = args.timeout {
        config.relay.timeout = timeout;
    }
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.server.http_port = port;
    }
    if args.cors {
        config.server.cors = true;
    }

    if args.write_config {
        let path = args
            .config
            .or_else(AppConfig::default_path)
            .context("No config directory available, pass --config")?;
        config.save(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    tracing::info!("Starting Multicast Relay");

    let relay = Relay::provision(&config.relay).context("Failed to provision relay")?;
    tracing::info!(
        "Joining groups on {} with a {:?} first-packet timeout",
        relay.opener().interface(),
        relay.first_packet_timeout()
    );

    HttpServer::new(config.server, Arc::new(relay)).run().await?;

    Ok(())
}
