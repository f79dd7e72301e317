//! Time source for cooldowns, rate windows and cache TTLs.

use chrono::{DateTime, Utc};

/// Supplies the current time.
///
/// Production code uses [`SystemClock`]; tests drive a manual clock so TTL and
/// cooldown behavior can be checked without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
