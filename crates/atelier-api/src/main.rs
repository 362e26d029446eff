//! # atelier-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Atelier escrow API.
//! Binds to a configurable port (default 3000).

use std::time::Duration;

use atelier_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let auto_confirm_secs: u64 = std::env::var("AUTO_CONFIRM_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    let config = AppConfig {
        port,
        auto_confirm: Duration::from_secs(auto_confirm_secs),
    };

    let state = AppState::with_config(config);
    let app = atelier_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Atelier escrow API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
