// Main entry point for the provider API server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::{
    kernel::{build_coordinator, start_scheduler},
    server::build_app,
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,provider_fallback=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Market Scout provider API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Register providers
    let coordinator = Arc::new(
        build_coordinator(&config)
            .await
            .context("Failed to build provider coordinator")?,
    );

    // Disable providers whose keys are rejected before any traffic reaches them
    if config.validate_on_startup {
        let report = coordinator
            .validate_providers()
            .await
            .context("Failed to validate providers")?;
        if !report.is_healthy() {
            tracing::warn!("No valid provider for at least one capability, see /health");
        }
    }

    // Background maintenance
    let mut scheduler = start_scheduler(coordinator.clone())
        .await
        .context("Failed to start scheduler")?;

    // Build application
    let app = build_app(coordinator.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down");
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown failed: {}", e);
    }
    coordinator.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
