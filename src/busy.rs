//! Tiered retry policy for a locked database.
//!
//! The engine calls the busy handler with the number of times it has
//! already been invoked for the current lock. The policy first spins
//! (yielding the thread without sleeping), then sleeps for a fixed
//! interval per attempt, then gives up and lets the busy error reach the
//! caller.

use std::os::raw::{c_int, c_void};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_SPIN_ATTEMPTS: u32 = 1_000;
const DEFAULT_SLEEP_ATTEMPTS: u32 = 200;
const DEFAULT_SLEEP_INTERVAL_MS: u64 = 100;

/// Retry budget applied when the engine reports the database busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPolicy {
    /// Attempts answered with a bare thread yield.
    #[serde(default = "default_spin_attempts")]
    pub spin_attempts: u32,
    /// Attempts answered with a sleep, after the spin tier.
    #[serde(default = "default_sleep_attempts")]
    pub sleep_attempts: u32,
    /// Sleep per attempt in the sleep tier, in milliseconds.
    #[serde(default = "default_sleep_interval_ms")]
    pub sleep_interval_ms: u64,
}

const fn default_spin_attempts() -> u32 {
    DEFAULT_SPIN_ATTEMPTS
}

const fn default_sleep_attempts() -> u32 {
    DEFAULT_SLEEP_ATTEMPTS
}

const fn default_sleep_interval_ms() -> u64 {
    DEFAULT_SLEEP_INTERVAL_MS
}

impl Default for BusyPolicy {
    fn default() -> Self {
        Self {
            spin_attempts: DEFAULT_SPIN_ATTEMPTS,
            sleep_attempts: DEFAULT_SLEEP_ATTEMPTS,
            sleep_interval_ms: DEFAULT_SLEEP_INTERVAL_MS,
        }
    }
}

/// What the busy handler does for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyAction {
    Yield,
    Sleep(Duration),
    GiveUp,
}

impl BusyPolicy {
    /// `sleep_interval` is rounded up to whole milliseconds, so a
    /// non-zero interval never becomes a zero sleep.
    pub fn new(spin_attempts: u32, sleep_attempts: u32, sleep_interval: Duration) -> Self {
        let millis = sleep_interval.as_micros().div_ceil(1_000);
        Self {
            spin_attempts,
            sleep_attempts,
            sleep_interval_ms: u64::try_from(millis).unwrap_or(u64::MAX),
        }
    }

    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self::new(0, 0, Duration::ZERO)
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_interval_ms)
    }

    /// Retries granted before the busy error propagates.
    pub fn total_attempts(&self) -> u64 {
        u64::from(self.spin_attempts) + u64::from(self.sleep_attempts)
    }

    /// Picks the action for the attempt numbered `attempts` (0-based).
    pub fn decide(&self, attempts: u32) -> BusyAction {
        let attempts = u64::from(attempts);
        if attempts < u64::from(self.spin_attempts) {
            BusyAction::Yield
        } else if attempts < self.total_attempts() {
            BusyAction::Sleep(self.sleep_interval())
        } else {
            BusyAction::GiveUp
        }
    }
}

/// Engine busy handler. `policy` points at the connection's boxed
/// [`BusyPolicy`].
pub(crate) unsafe extern "C" fn busy_callback(policy: *mut c_void, attempts: c_int) -> c_int {
    let policy = &*(policy as *const BusyPolicy);
    let attempts = attempts.max(0) as u32;
    match policy.decide(attempts) {
        BusyAction::Yield => {
            thread::yield_now();
            1
        }
        BusyAction::Sleep(delay) => {
            debug!(
                attempts,
                delay_ms = delay.as_millis() as u64,
                "database busy, sleeping before retry"
            );
            thread::sleep(delay);
            1
        }
        BusyAction::GiveUp => {
            warn!(attempts, "database busy, retry budget exhausted");
            0
        }
    }
}
