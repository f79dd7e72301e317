//! Provider registry with circuit-breaker bookkeeping.
//!
//! Each capability owns one registry. The registry decides which providers
//! are eligible for an attempt and records the outcome of every attempt:
//!
//! - generic failures count toward [`BreakerPolicy::error_threshold`]; at the
//!   threshold the provider is disabled for [`BreakerPolicy::cooldown`]
//! - quota failures disable for [`BreakerPolicy::quota_cooldown`]
//! - config failures disable until a manual [`ProviderRegistry::reset`]
//!
//! A disabled provider whose `disabled_until` has passed comes back with a
//! clean error count the next time it is looked at.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::error::{FailureKind, ProviderError};
use crate::types::attempt::describe;
use crate::types::config::{after, BreakerPolicy};
use crate::types::provider::{Capability, DisableReason, ProviderConfig, ProviderState};

/// Ordered providers for one capability plus their health state.
pub struct ProviderRegistry {
    capability: Capability,
    policy: BreakerPolicy,
    providers: RwLock<IndexMap<String, ProviderState>>,
}

impl ProviderRegistry {
    pub fn new(capability: Capability, policy: BreakerPolicy) -> Self {
        Self {
            capability,
            policy,
            providers: RwLock::new(IndexMap::new()),
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn policy(&self) -> &BreakerPolicy {
        &self.policy
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, ProviderState>> {
        self.providers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, ProviderState>> {
        self.providers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a provider. It starts enabled iff `configured`.
    ///
    /// Registering an id twice replaces the earlier entry.
    pub fn register(&self, config: ProviderConfig, configured: bool) {
        if !configured {
            info!(
                capability = %self.capability,
                provider = %config.id,
                "Provider registered without credentials, starting disabled"
            );
        }
        let state = ProviderState::new(config, configured);
        self.write().insert(state.id().to_string(), state);
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Current state of one provider.
    pub fn get(&self, id: &str) -> Option<ProviderState> {
        self.read().get(id).cloned()
    }

    /// Enabled providers sorted by (priority, error_count).
    ///
    /// Expired disables are lifted first. If nothing is left, every configured
    /// provider is reset and returned, except those disabled for a
    /// configuration error.
    pub fn list_available(&self, now: DateTime<Utc>) -> Vec<ProviderState> {
        let mut providers = self.write();

        for state in providers.values_mut() {
            reactivate_if_expired(self.capability, state, now);
        }

        let mut available: Vec<ProviderState> =
            providers.values().filter(|s| s.enabled).cloned().collect();

        if available.is_empty() {
            let mut revived = 0usize;
            for state in providers.values_mut() {
                if state.configured && state.disable_reason != Some(DisableReason::Config) {
                    state.reenable();
                    revived += 1;
                }
            }
            if revived > 0 {
                warn!(
                    capability = %self.capability,
                    revived,
                    "All providers disabled, resetting error counts"
                );
            }
            available = providers.values().filter(|s| s.enabled).cloned().collect();
        }

        available.sort_by_key(|s| (s.priority(), s.error_count));
        available
    }

    /// Record a successful call. The error count is left unchanged.
    pub fn record_success(&self, id: &str, now: DateTime<Utc>) {
        if let Some(state) = self.write().get_mut(id) {
            state.last_success_at = Some(now);
        }
    }

    /// Record a failed call and apply the breaker policy.
    ///
    /// Returns the disable reason if this failure disabled the provider or
    /// tightened an existing disable. An existing disable is never weakened.
    pub fn record_failure(
        &self,
        id: &str,
        error: &ProviderError,
        now: DateTime<Utc>,
    ) -> Option<DisableReason> {
        let mut providers = self.write();
        let state = providers.get_mut(id)?;

        state.error_count = state.error_count.saturating_add(1);
        state.last_error = Some(error.to_string());

        let kind = error.kind();
        let proposed = match kind {
            FailureKind::Generic if state.error_count >= self.policy.error_threshold => Some((
                DisableReason::ErrorThreshold,
                Some(after(now, self.policy.cooldown)),
            )),
            FailureKind::Generic => None,
            FailureKind::Quota => Some((
                DisableReason::Quota,
                Some(after(now, self.policy.quota_cooldown)),
            )),
            FailureKind::Config => Some((DisableReason::Config, None)),
        };
        // Late failures from calls started before a disable may only
        // strengthen it.
        let disable = proposed.filter(|(reason, until)| strengthens(state, *reason, *until));

        match disable {
            Some((reason, until)) => {
                state.enabled = false;
                state.disabled_until = until;
                state.disable_reason = Some(reason);
                warn!(
                    capability = %self.capability,
                    provider = %id,
                    error_count = state.error_count,
                    kind = describe(kind),
                    disabled_until = ?until,
                    "Provider disabled: {}",
                    error
                );
                Some(reason)
            }
            None => {
                warn!(
                    capability = %self.capability,
                    provider = %id,
                    error_count = state.error_count,
                    kind = describe(kind),
                    "Provider failed: {}",
                    error
                );
                None
            }
        }
    }

    /// Re-enable a provider whose cooldown has passed.
    ///
    /// Returns true if the provider was reactivated.
    pub fn maybe_reactivate(&self, id: &str, now: DateTime<Utc>) -> bool {
        match self.write().get_mut(id) {
            Some(state) => reactivate_if_expired(self.capability, state, now),
            None => false,
        }
    }

    /// Manually reset one provider. Returns false for an unknown id.
    pub fn reset(&self, id: &str) -> bool {
        match self.write().get_mut(id) {
            Some(state) => {
                manual_reset(state);
                info!(capability = %self.capability, provider = %id, "Provider errors reset");
                true
            }
            None => false,
        }
    }

    /// Manually reset every provider.
    pub fn reset_all(&self) {
        for state in self.write().values_mut() {
            manual_reset(state);
        }
        info!(capability = %self.capability, "All provider errors reset");
    }

    /// Stable identity of the provider set, used in cache keys.
    pub fn fingerprint(&self) -> String {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids.join(",")
    }

    /// Every provider's state in registration order.
    pub fn snapshot(&self) -> Vec<ProviderState> {
        self.read().values().cloned().collect()
    }
}

fn reactivate_if_expired(capability: Capability, state: &mut ProviderState, now: DateTime<Utc>) -> bool {
    match state.disabled_until {
        Some(until) if !state.enabled && until <= now => {
            state.reenable();
            info!(
                capability = %capability,
                provider = %state.id(),
                "Provider cooldown expired, re-enabled"
            );
            true
        }
        _ => false,
    }
}

/// Whether disabling with `reason` until `until` is stricter than the current state.
///
/// A config disable outranks any timed one; between timed disables the
/// later expiry wins.
fn strengthens(state: &ProviderState, reason: DisableReason, until: Option<DateTime<Utc>>) -> bool {
    if state.enabled {
        return true;
    }
    match (state.disable_reason, state.disabled_until, until) {
        (Some(DisableReason::Config), _, _) => false,
        (_, _, None) => reason == DisableReason::Config,
        (Some(_), Some(current), Some(proposed)) => proposed > current,
        _ => true,
    }
}

fn manual_reset(state: &mut ProviderState) {
    state.reenable();
    state.last_error = None;
}
