use axum::{extract::Extension, http::StatusCode, Json};
use indexmap::IndexMap;
use provider_fallback::ValidationReport;
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    providers: IndexMap<String, CapabilityHealth>,
    cache_enabled: bool,
    /// Last credential check, if one has run
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<ValidationReport>,
}

#[derive(Serialize)]
pub struct CapabilityHealth {
    enabled: usize,
    registered: usize,
}

/// Health check endpoint
///
/// Reports how many providers per capability can currently take traffic.
/// A capability with none enabled makes the service "degraded" but still
/// returns 200, since the breaker may re-enable providers on its own. So
/// does a credential check that left a capability without a valid provider.
/// Returns 503 Service Unavailable once the coordinator is shut down.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let coordinator = &state.coordinator;

    let providers: IndexMap<String, CapabilityHealth> = coordinator
        .provider_status()
        .into_iter()
        .map(|(capability, statuses)| {
            let health = CapabilityHealth {
                enabled: statuses.values().filter(|s| s.enabled && !s.rate_limited).count(),
                registered: statuses.len(),
            };
            (capability.to_string(), health)
        })
        .collect();

    let validation = coordinator.last_validation();
    let credentials_ok = validation.as_ref().map_or(true, ValidationReport::is_healthy);

    let (status_code, status) = if coordinator.is_shut_down() {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting_down")
    } else if !credentials_ok || providers.values().any(|h| h.enabled == 0) {
        (StatusCode::OK, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            providers,
            cache_enabled: coordinator.cache().is_enabled(),
            validation,
        }),
    )
}
