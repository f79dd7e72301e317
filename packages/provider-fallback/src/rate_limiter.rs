//! Sliding-window request counter per provider.
//!
//! Each provider has a log of request timestamps. Before an attempt the
//! coordinator calls [`RateLimiter::try_acquire`], which prunes entries older
//! than the window, checks the limit and records the request under one lock.
//! A provider over its limit is skipped, not failed.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::config::before;

/// In-memory rolling-window limiter.
pub struct RateLimiter {
    window: Duration,
    requests: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<DateTime<Utc>>>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `id` may issue another request under `limit`.
    ///
    /// `None` means unlimited.
    pub fn allow(&self, id: &str, limit: Option<u32>, now: DateTime<Utc>) -> bool {
        let Some(limit) = limit else {
            return true;
        };
        let mut requests = self.lock();
        match requests.get_mut(id) {
            Some(log) => {
                prune(log, before(now, self.window));
                log.len() < limit as usize
            }
            None => limit > 0,
        }
    }

    /// Check the limit and record a request at `now` in one step.
    ///
    /// Returns false, recording nothing, when `id` is at its limit. Concurrent
    /// callers can never push the window past `limit`.
    pub fn try_acquire(&self, id: &str, limit: Option<u32>, now: DateTime<Utc>) -> bool {
        let mut requests = self.lock();
        let log = requests.entry(id.to_string()).or_default();
        prune(log, before(now, self.window));
        if limit.is_some_and(|limit| log.len() >= limit as usize) {
            return false;
        }
        log.push_back(now);
        true
    }

    /// Record a request issued at `now`.
    pub fn record(&self, id: &str, now: DateTime<Utc>) {
        let mut requests = self.lock();
        let log = requests.entry(id.to_string()).or_default();
        prune(log, before(now, self.window));
        log.push_back(now);
    }

    /// Requests counted in the current window.
    pub fn in_window(&self, id: &str, now: DateTime<Utc>) -> usize {
        let mut requests = self.lock();
        match requests.get_mut(id) {
            Some(log) => {
                prune(log, before(now, self.window));
                log.len()
            }
            None => 0,
        }
    }

    /// Forget every recorded request.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

fn prune(log: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
    while log.front().is_some_and(|t| *t <= cutoff) {
        log.pop_front();
    }
}
