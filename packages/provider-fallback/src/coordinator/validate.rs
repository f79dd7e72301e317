//! Credential checks run before the first real request.
//!
//! Each configured, enabled provider gets one cheap call through its
//! adapter's `validate`. The outcome goes through the registry like any
//! other call, so a rejected key becomes a `Config` disable before a user
//! request ever reaches it.

use std::sync::{Arc, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use indexmap::IndexMap;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::{FailureKind, ProviderError, ProviderResult, Result};
use crate::traits::{
    extractor::ContentExtractor, generator::TextGenerator, searcher::WebSearcher,
};
use crate::types::provider::Capability;

use super::{Chain, FallbackCoordinator};

/// What the check found for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid,
    Invalid { kind: FailureKind, error: String },
    /// Not called: unconfigured, already disabled or rate limited.
    Skipped { reason: String },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    fn skipped(reason: &str) -> Self {
        ValidationOutcome::Skipped {
            reason: reason.to_string(),
        }
    }
}

/// Outcome of one validation pass, grouped by capability then provider id.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub checked_at: DateTime<Utc>,
    pub providers: IndexMap<Capability, IndexMap<String, ValidationOutcome>>,
}

impl ValidationReport {
    /// Every capability with registered providers has at least one valid one.
    pub fn is_healthy(&self) -> bool {
        self.providers
            .values()
            .all(|outcomes| outcomes.is_empty() || outcomes.values().any(ValidationOutcome::is_valid))
    }

    /// `(capability, provider id, error)` for every rejected provider.
    pub fn invalid(&self) -> Vec<(Capability, &str, &str)> {
        self.providers
            .iter()
            .flat_map(|(capability, outcomes)| {
                outcomes.iter().filter_map(move |(id, outcome)| match outcome {
                    ValidationOutcome::Invalid { error, .. } => {
                        Some((*capability, id.as_str(), error.as_str()))
                    }
                    _ => None,
                })
            })
            .collect()
    }
}

impl FallbackCoordinator {
    /// Check every configured provider's credentials with one cheap call.
    ///
    /// Failures are recorded in the registry: a rejected key disables the
    /// provider until reset, a quota answer starts the cooldown. The report
    /// is kept and returned by [`last_validation`](Self::last_validation).
    pub async fn validate_providers(&self) -> Result<ValidationReport> {
        self.ensure_open()?;

        let (text, search, extraction) = futures::join!(
            self.validate_chain(&self.text, |generator: Arc<dyn TextGenerator>| {
                Box::pin(async move { generator.validate().await })
            }),
            self.validate_chain(&self.search, |searcher: Arc<dyn WebSearcher>| {
                Box::pin(async move { searcher.validate().await })
            }),
            self.validate_chain(&self.extraction, |extractor: Arc<dyn ContentExtractor>| {
                Box::pin(async move { extractor.validate().await })
            }),
        );

        let mut providers = IndexMap::new();
        providers.insert(Capability::Text, text);
        providers.insert(Capability::Search, search);
        providers.insert(Capability::Extraction, extraction);

        let report = ValidationReport {
            checked_at: self.clock.now(),
            providers,
        };

        for (capability, id, error) in report.invalid() {
            warn!(%capability, provider = %id, %error, "Provider failed validation");
        }
        info!(healthy = report.is_healthy(), "Provider validation finished");

        *self
            .validation
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        Ok(report)
    }

    /// The report from the most recent [`validate_providers`](Self::validate_providers).
    pub fn last_validation(&self) -> Option<ValidationReport> {
        self.validation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn validate_chain<A, F>(
        &self,
        chain: &Chain<A>,
        check: F,
    ) -> IndexMap<String, ValidationOutcome>
    where
        A: ?Sized + Send + Sync,
        F: Fn(Arc<A>) -> BoxFuture<'static, ProviderResult<()>>,
    {
        let checks = chain.registry.snapshot().into_iter().map(|state| {
            let check = &check;
            async move {
                let id = state.id().to_string();
                let now = self.clock.now();

                if !state.configured {
                    return (id, ValidationOutcome::skipped("not configured"));
                }
                if !state.enabled {
                    return (id, ValidationOutcome::skipped("disabled"));
                }
                let Some(adapter) = chain.adapter(&id) else {
                    return (id, ValidationOutcome::skipped("no adapter registered"));
                };
                if !chain.try_dispatch(&state, now) {
                    return (id, ValidationOutcome::skipped("rate limited"));
                }

                let budget = state.config.timeout.unwrap_or(self.config.request_timeout);
                let error = match timeout(budget, check(adapter)).await {
                    Ok(Ok(())) => {
                        chain.registry.record_success(&id, self.clock.now());
                        return (id, ValidationOutcome::Valid);
                    }
                    Ok(Err(error)) => error,
                    Err(_) => ProviderError::Timeout(budget),
                };

                chain.registry.record_failure(&id, &error, self.clock.now());
                let outcome = ValidationOutcome::Invalid {
                    kind: error.kind(),
                    error: error.to_string(),
                };
                (id, outcome)
            }
        });

        join_all(checks).await.into_iter().collect()
    }
}
