//! Mapping from coordinator errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use provider_fallback::{FallbackError, RequestAttempt};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attempts: Vec<RequestAttempt>,
}

/// A [`FallbackError`] rendered as JSON.
pub struct ApiError(pub FallbackError);

impl From<FallbackError> for ApiError {
    fn from(err: FallbackError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            FallbackError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            FallbackError::AllProvidersFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            FallbackError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
            FallbackError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.0.to_string();
        let attempts = match self.0 {
            FallbackError::AllProvidersFailed { attempts, .. } => attempts,
            _ => Vec::new(),
        };

        if status.is_server_error() {
            tracing::warn!(status = %status, error = %error, "Resolution failed");
        }
        (status, Json(ErrorBody { error, attempts })).into_response()
    }
}
