//! AppGuard Server - REST API for hardware-rooted device authentication
//!
//! Exposes appguard-core functionality via HTTP endpoints:
//! - POST /device/register, /device/challenge, /device/attest, /device/assert
//! - POST /session/login, /session/refresh; GET /session

use std::net::SocketAddr;
use std::process::ExitCode;

use appguard_core::TokenConfig;
use appguard_server::{create_router_with_config, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    let token_config = TokenConfig::from_env()?;
    let state = AppState::from_config(&config, token_config)?;

    // Fail fast: no attestation traffic without the root of trust
    state.trust.get_root_certificate()?;

    let app = create_router_with_config(&config, state)?;

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "AppGuard server listening (docs at /swagger-ui)");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
