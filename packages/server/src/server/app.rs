//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use provider_fallback::FallbackCoordinator;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::routes::{
    clear_cache_handler, extract_batch_handler, extract_handler, health_handler,
    provider_status_handler, reset_providers_handler, search_handler, text_handler,
    validate_providers_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<FallbackCoordinator>,
}

/// Build the Axum application router
///
/// Resolution routes are thin wrappers over the coordinator; the admin
/// routes expose provider health and cache maintenance.
pub fn build_app(coordinator: Arc<FallbackCoordinator>) -> Router {
    let state = AppState { coordinator };

    Router::new()
        .route("/health", get(health_handler))
        .route("/providers", get(provider_status_handler))
        .route("/providers/reset", post(reset_providers_handler))
        .route("/providers/validate", post(validate_providers_handler))
        .route("/cache/clear", post(clear_cache_handler))
        .route("/resolve/text", post(text_handler))
        .route("/resolve/search", post(search_handler))
        .route("/resolve/extract", post(extract_handler))
        .route("/resolve/extract/batch", post(extract_batch_handler))
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
