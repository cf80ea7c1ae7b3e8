//! Login Attempt Limiter
//!
//! Counts consecutive failed sign-ins for the profile and enforces a timed
//! lockout. The lockout is checked before the identity provider is contacted.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use platform::clock::Clock;
use platform::timer::{Countdown, ceil_secs};

use crate::application::config::LockoutPolicy;
use crate::domain::entity::login_attempt::LoginAttemptRecord;
use crate::domain::repository::LoginAttemptRepository;

/// Format seconds as `M:SS`
pub fn format_lockout_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Login attempt limiter. Clones share state.
pub struct LoginLimiter<R>
where
    R: LoginAttemptRepository + 'static,
{
    inner: Arc<LimiterInner<R>>,
}

struct LimiterInner<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: LockoutPolicy,
    lockout: Mutex<LockoutClock>,
}

#[derive(Default)]
struct LockoutClock {
    countdown: Option<Countdown>,
    generation: u64,
}

impl<R> Clone for LoginLimiter<R>
where
    R: LoginAttemptRepository + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R> LoginLimiter<R>
where
    R: LoginAttemptRepository + 'static,
{
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, policy: LockoutPolicy) -> Self {
        Self {
            inner: Arc::new(LimiterInner {
                repo,
                clock,
                policy,
                lockout: Mutex::new(LockoutClock::default()),
            }),
        }
    }

    /// Whether sign-in is currently blocked.
    ///
    /// Resumes the countdown for a persisted lockout and clears a lockout
    /// that has already elapsed.
    pub fn check_lockout_status(&self) -> bool {
        let now = self.inner.clock.now_ms();
        let Some(record) = self.load() else {
            // Unreadable record: keep whatever this context already knows
            return self.is_locked();
        };

        if record.is_locked_at(now) {
            let left = Duration::from_millis(record.remaining_ms(now) as u64);
            self.ensure_countdown(left);
            true
        } else if record.lockout_elapsed_at(now) {
            tracing::info!("Stored login lockout has elapsed");
            self.reset_failed_attempts();
            false
        } else {
            false
        }
    }

    /// Count a failed sign-in; engages the lockout at the threshold
    pub fn record_failed_attempt(&self) {
        let now = self.inner.clock.now_ms();
        let policy = &self.inner.policy;
        let mut record = self.load().unwrap_or_default();

        let locked = record.record_failure(now, policy.max_attempts, policy.lockout_ms());
        self.store(&record);

        if locked {
            tracing::warn!(
                attempts = record.attempts,
                lockout_secs = policy.lockout_duration.as_secs(),
                "Too many failed sign-ins, locking out"
            );
            self.restart_countdown(policy.lockout_duration);
        } else {
            tracing::info!(
                attempts = record.attempts,
                remaining = policy.max_attempts.saturating_sub(record.attempts),
                "Failed sign-in recorded"
            );
        }
    }

    /// Zero the record and stop any running lockout
    pub fn reset_failed_attempts(&self) {
        self.store(&LoginAttemptRecord::default());

        let mut lockout = self.lock_clock();
        lockout.generation += 1;
        if lockout.countdown.take().is_some() {
            tracing::info!("Login lockout cleared");
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lockout_time_remaining() > 0
    }

    /// Whole seconds left in the lockout, ticking once per second
    pub fn lockout_time_remaining(&self) -> u64 {
        self.lock_clock()
            .countdown
            .as_ref()
            .map(Countdown::remaining_secs)
            .unwrap_or(0)
    }

    /// Minutes left, rounded up, for user-facing messages
    pub fn minutes_remaining(&self) -> u64 {
        self.lockout_time_remaining().div_ceil(60)
    }

    /// Stored failure count (0 when unreadable)
    pub fn attempts(&self) -> u32 {
        self.load().map(|r| r.attempts).unwrap_or(0)
    }

    /// Stop the countdown without touching the stored record
    pub fn shutdown(&self) {
        let mut lockout = self.lock_clock();
        lockout.generation += 1;
        lockout.countdown = None;
    }

    fn load(&self) -> Option<LoginAttemptRecord> {
        match self.inner.repo.load_attempts() {
            Ok(record) => Some(record.unwrap_or_default()),
            Err(e) => {
                e.log();
                None
            }
        }
    }

    fn store(&self, record: &LoginAttemptRecord) {
        if let Err(e) = self.inner.repo.save_attempts(record) {
            e.log();
        }
    }

    fn lock_clock(&self) -> MutexGuard<'_, LockoutClock> {
        self.inner
            .lockout
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_countdown(&self, left: Duration) {
        let running = self
            .lock_clock()
            .countdown
            .as_ref()
            .is_some_and(Countdown::is_running);
        if !running {
            tracing::debug!(secs = ceil_secs(left), "Resuming login lockout countdown");
            self.restart_countdown(left);
        }
    }

    fn restart_countdown(&self, left: Duration) {
        let mut lockout = self.lock_clock();
        lockout.generation += 1;
        let generation = lockout.generation;
        let weak: Weak<LimiterInner<R>> = Arc::downgrade(&self.inner);

        lockout.countdown = Some(Countdown::start(left, move || async move {
            if let Some(inner) = weak.upgrade() {
                LoginLimiter { inner }.on_lockout_elapsed(generation);
            }
        }));
    }

    fn on_lockout_elapsed(&self, generation: u64) {
        if self.lock_clock().generation != generation {
            return;
        }
        self.reset_failed_attempts();
    }
}
