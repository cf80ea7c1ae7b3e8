//! Application Configuration
//!
//! Lockout and idle-timeout policies. Defaults are the defensive values;
//! looser historical behavior is a different configuration.

use std::collections::HashSet;
use std::time::Duration;

use crate::domain::value_object::activity_kind::ActivityKind;

/// Guard configuration
#[derive(Debug, Clone, Default)]
pub struct GuardConfig {
    pub lockout: LockoutPolicy,
    pub idle: IdlePolicy,
}

impl GuardConfig {
    /// Short timeouts for local runs
    pub fn development() -> Self {
        Self {
            lockout: LockoutPolicy {
                lockout_duration: Duration::from_secs(60),
                ..Default::default()
            },
            idle: IdlePolicy {
                session_timeout: Duration::from_secs(120),
                warning_timeout: Duration::from_secs(30),
                debounce_floor: Duration::from_secs(5),
                ..Default::default()
            },
        }
    }
}

/// Login lockout policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that engage the lockout
    pub max_attempts: u32,
    /// Lockout length
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
        }
    }
}

impl LockoutPolicy {
    pub fn lockout_ms(&self) -> i64 {
        self.lockout_duration.as_millis() as i64
    }
}

/// Idle session policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdlePolicy {
    /// Idle budget until forced logout (30 minutes; 2 hours is the other product setting)
    pub session_timeout: Duration,
    /// Grace period between the warning and forced logout
    pub warning_timeout: Duration,
    /// Activity closer than this to the last recorded one is ignored
    pub debounce_floor: Duration,
    /// Coalescing window for bursts of input events
    pub batch_delay: Duration,
    /// Events that count as activity
    pub qualifying_events: HashSet<ActivityKind>,
    /// Whether activity during the warning counts as "stay signed in"
    pub activity_dismisses_warning: bool,
    /// Arm a backstop expiry timer at `session_timeout` alongside the warning timer
    pub absolute_expiry: bool,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(30 * 60),
            warning_timeout: Duration::from_secs(5 * 60),
            debounce_floor: Duration::from_secs(30),
            batch_delay: Duration::from_millis(100),
            qualifying_events: ActivityKind::ALL.into_iter().collect(),
            activity_dismisses_warning: false,
            absolute_expiry: true,
        }
    }
}

impl IdlePolicy {
    /// Delay from the last activity until the warning
    pub fn warning_delay(&self) -> Duration {
        self.session_timeout.saturating_sub(self.warning_timeout)
    }

    pub fn qualifies(&self, kind: ActivityKind) -> bool {
        self.qualifying_events.contains(&kind)
    }

    pub fn debounce_floor_ms(&self) -> i64 {
        self.debounce_floor.as_millis() as i64
    }

    /// Policy of the earliest revision: pointer/keyboard events only,
    /// no debounce floor and no batching.
    pub fn permissive() -> Self {
        use ActivityKind::*;
        Self {
            debounce_floor: Duration::ZERO,
            batch_delay: Duration::ZERO,
            qualifying_events: [PointerDown, PointerMove, KeyDown, Scroll, TouchStart, Click]
                .into_iter()
                .collect(),
            activity_dismisses_warning: true,
            absolute_expiry: false,
            ..Default::default()
        }
    }
}
