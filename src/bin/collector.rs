//! Development collector: prints every datagram it receives.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tokio::net::UdpSocket;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

/// Receive Jarmo datagrams and log their JSON payloads
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// UDP port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let socket = UdpSocket::bind((cli.bind.as_str(), cli.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", cli.bind, cli.port))?;
    info!("Collector listening on {}", socket.local_addr()?);

    // Max UDP payload
    let mut buf = vec![0u8; 65_507];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = received.context("Failed to receive datagram")?;
                match serde_json::from_slice::<Value>(&buf[..len]) {
                    Ok(payload) => info!("{} -> {}", peer, payload),
                    Err(e) => warn!("Dropping undecodable datagram from {}: {}", peer, e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Exiting...");
                return Ok(());
            }
        }
    }
}
