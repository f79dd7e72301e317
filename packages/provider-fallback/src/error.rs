//! Typed errors for the fallback core.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the coordinator can
//! classify every provider failure without inspecting strings.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::types::attempt::RequestAttempt;
use crate::types::provider::Capability;

/// A failure raised by a single provider adapter.
///
/// Adapters map every transport error, HTTP status and parse failure into one
/// of these variants; nothing else crosses the adapter boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider is disabled or rate limited and was not attempted
    #[error("provider unavailable: {reason}")]
    Unavailable { reason: String },

    /// Network failure or retryable server error
    #[error("transport error: {0}")]
    Transport(String),

    /// Call exceeded its time budget and was abandoned
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Explicit 429 / quota signal from the provider
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Bad credentials or a request the provider will never accept
    #[error("configuration error: {0}")]
    Config(String),

    /// Response parsed but carried nothing usable
    #[error("empty result")]
    EmptyResult,

    /// Response did not match the provider's documented schema
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// How a failure affects the provider's health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Counts toward the error threshold.
    Generic,
    /// Disables the provider for the quota cooldown.
    Quota,
    /// Disables the provider until a manual reset.
    Config,
}

impl ProviderError {
    /// Classify this error for circuit-breaker bookkeeping.
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::QuotaExceeded(_) => FailureKind::Quota,
            ProviderError::Config(_) => FailureKind::Config,
            _ => FailureKind::Generic,
        }
    }

    /// Whether this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProviderError::Transport(format!("request timed out: {}", err));
        }
        if err.is_decode() {
            return ProviderError::InvalidResponse(err.to_string());
        }
        ProviderError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(err.to_string())
    }
}

/// Errors returned by the coordinator's `resolve_*` operations.
#[derive(Debug, Error)]
pub enum FallbackError {
    /// Every available provider was tried (or skipped) and none succeeded
    #[error("all {capability} providers failed ({} attempts)", attempts.len())]
    AllProvidersFailed {
        capability: Capability,
        attempts: Vec<RequestAttempt>,
    },

    /// The request was rejected before any provider was contacted
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A batch deadline passed before this item resolved
    #[error("{capability} deadline of {deadline:?} exceeded")]
    DeadlineExceeded {
        capability: Capability,
        deadline: Duration,
    },

    /// The coordinator has been shut down
    #[error("coordinator is shut down")]
    ShutDown,
}

/// Errors raised by cache backends.
///
/// These never escape `resolve_*`; the cache logs them and reports a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Payload could not be encoded or decoded
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend storage failed
    #[error("cache storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for adapter calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Result type alias for coordinator operations.
pub type Result<T> = std::result::Result<T, FallbackError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
