//! Jarmo demo server
//!
//! A small axum application wrapped in the response-time layer. Useful for
//! trying the instrumentation against a running `collector`.
//!
//! # Usage
//! ```sh
//! JARMO_ENABLE=1 cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `JARMO_ENABLE` - Enable reporting (default: disabled)
//! - `JARMO_HOST` / `JARMO_PORT` - Collector address (default: localhost:8000)
//! - `SERVER_ADDR` - Listen address (default: 127.0.0.1:3000)

use anyhow::{Context, Result};
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use jarmo::config::{EnvConfig, JarmoConfig};
use jarmo::{Interceptor, Metrics, ResponseTimeLayer, UdpTransmitter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Jarmo demo server {} starting...", env!("CARGO_PKG_VERSION"));

    let env = EnvConfig::from_env();
    let transmitter = UdpTransmitter::bind()
        .await
        .context("Failed to bind UDP socket")?;
    let metrics = Metrics::new()?;
    let interceptor = Interceptor::new(
        Some(JarmoConfig::from(&env)),
        Arc::new(transmitter),
        env.enabled,
    )
    .with_metrics(metrics.clone());

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(250)).await;
                "slow"
            }),
        )
        .route("/metrics", get(move || async move { metrics.render() }))
        .layer(ResponseTimeLayer::new(interceptor));

    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received. Exiting...");
        })
        .await?;

    Ok(())
}
