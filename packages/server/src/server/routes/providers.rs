//! Admin endpoints for provider health and the result cache.

use axum::{extract::Extension, http::StatusCode, Json};
use provider_fallback::{StatusReport, ValidationReport};
use serde::{Deserialize, Serialize};

use crate::server::app::AppState;
use crate::server::routes::error::ApiError;

/// GET /providers
pub async fn provider_status_handler(Extension(state): Extension<AppState>) -> Json<StatusReport> {
    Json(state.coordinator.provider_status())
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    /// Provider id to reset; all providers when omitted
    provider: Option<String>,
}

#[derive(Serialize)]
pub struct ResetResponse {
    reset: String,
}

/// POST /providers/reset
///
/// Clears error counts and re-enables providers, including ones disabled
/// for bad credentials. Unknown ids return 404.
pub async fn reset_providers_handler(
    Extension(state): Extension<AppState>,
    body: Option<Json<ResetRequest>>,
) -> Result<Json<ResetResponse>, StatusCode> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let provider = request.provider.filter(|id| !id.trim().is_empty());

    if !state.coordinator.reset_provider_errors(provider.as_deref()) {
        return Err(StatusCode::NOT_FOUND);
    }

    let reset = provider.unwrap_or_else(|| "all".to_string());
    tracing::info!(provider = %reset, "Provider errors reset");
    Ok(Json(ResetResponse { reset }))
}

/// POST /providers/validate
///
/// Re-runs the credential check. Providers whose keys are rejected are
/// disabled until reset.
pub async fn validate_providers_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<ValidationReport>, ApiError> {
    let report = state.coordinator.validate_providers().await?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct ClearCacheResponse {
    removed: usize,
}

/// POST /cache/clear
pub async fn clear_cache_handler(Extension(state): Extension<AppState>) -> Json<ClearCacheResponse> {
    let removed = state.coordinator.clear_cache().await;
    Json(ClearCacheResponse { removed })
}
