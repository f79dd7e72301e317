//! Transient record of one provider invocation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{FailureKind, ProviderError};

/// Outcome of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AttemptOutcome {
    Success,
    Failure { message: String },
    Timeout,
    /// Not attempted (rate limited or unavailable); no failure recorded
    Skipped { reason: String },
}

/// One provider invocation within a fallback chain.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAttempt {
    pub provider: String,
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl RequestAttempt {
    pub fn success(provider: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            provider: provider.into(),
            started_at,
            outcome: AttemptOutcome::Success,
        }
    }

    pub fn failed(
        provider: impl Into<String>,
        started_at: DateTime<Utc>,
        error: &ProviderError,
    ) -> Self {
        let outcome = if error.is_timeout() {
            AttemptOutcome::Timeout
        } else {
            AttemptOutcome::Failure {
                message: error.to_string(),
            }
        };
        Self {
            provider: provider.into(),
            started_at,
            outcome,
        }
    }

    pub fn skipped(
        provider: impl Into<String>,
        started_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            started_at,
            outcome: AttemptOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    /// Whether the provider was actually invoked.
    pub fn was_invoked(&self) -> bool {
        !matches!(self.outcome, AttemptOutcome::Skipped { .. })
    }
}

/// Classification of a failed attempt, kept for logs.
pub(crate) fn describe(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Generic => "generic",
        FailureKind::Quota => "quota",
        FailureKind::Config => "config",
    }
}
