//! Login Attempt Entity
//!
//! Consecutive sign-in failure tracking for one browser profile.

use serde::{Deserialize, Serialize};

/// Persisted failure counter and lockout window.
///
/// Invariant: `attempts >= max_attempts` implies `lockout_until` is set.
/// The counter only returns to zero on a successful sign-in or when the
/// lockout elapses; there is no sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginAttemptRecord {
    /// Consecutive failed sign-in attempts
    pub attempts: u32,
    /// Lockout end (Unix timestamp ms)
    pub lockout_until: Option<i64>,
    /// Most recent failure (Unix timestamp ms)
    pub last_attempt: i64,
}

impl LoginAttemptRecord {
    /// Lockout is set and still in the future
    pub fn is_locked_at(&self, now_ms: i64) -> bool {
        self.lockout_until.is_some_and(|until| until > now_ms)
    }

    /// Lockout is set but already over
    pub fn lockout_elapsed_at(&self, now_ms: i64) -> bool {
        self.lockout_until.is_some_and(|until| until <= now_ms)
    }

    /// Milliseconds left in the lockout, 0 when not locked
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.lockout_until
            .map(|until| (until - now_ms).max(0))
            .unwrap_or(0)
    }

    /// Record a failed attempt.
    ///
    /// Returns `true` when this failure engaged the lockout.
    pub fn record_failure(&mut self, now_ms: i64, max_attempts: u32, lockout_ms: i64) -> bool {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = now_ms;

        if self.attempts >= max_attempts {
            self.lockout_until = Some(now_ms + lockout_ms);
            true
        } else {
            self.lockout_until = None;
            false
        }
    }
}
