//! Cooperative Timers
//!
//! Cancellable one-shot delays and second-resolution countdowns on the
//! tokio timer. Both fire their callback as a detached task, so a callback
//! may cancel or replace the handle that produced it.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Round a duration up to whole seconds
pub fn ceil_secs(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}

// ============================================================================
// TimerHandle
// ============================================================================

/// One-shot delayed task. Dropping the handle cancels a pending fire.
#[derive(Debug, Default)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Schedule `callback` after `delay`
    pub fn after<F, Fut>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // Measured from scheduling, not from the task's first poll
        let deadline = Instant::now() + delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            tokio::spawn(callback());
        });
        Self { task: Some(task) }
    }

    /// Cancel a pending fire; no-op once fired
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether the timer is still waiting to fire
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// Countdown
// ============================================================================

/// Second-resolution countdown toward a fixed deadline.
///
/// Remaining seconds are published once per second (rounded up) and reach
/// zero exactly at the deadline, at which point `on_expire` is spawned.
#[derive(Debug)]
pub struct Countdown {
    remaining: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl Countdown {
    pub fn start<F, Fut>(duration: Duration, on_expire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + duration;
        let (tx, remaining) = watch::channel(ceil_secs(duration));

        let task = tokio::spawn(async move {
            loop {
                let left = ceil_secs(deadline.saturating_duration_since(Instant::now()));
                tx.send_replace(left);
                if left == 0 {
                    break;
                }
                // Wake on the next whole-second boundary measured from the deadline
                tokio::time::sleep_until(deadline - Duration::from_secs(left - 1)).await;
            }
            tokio::spawn(on_expire());
        });

        Self { remaining, task }
    }

    /// Seconds left, as of the last tick
    pub fn remaining_secs(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// Whether the countdown has not reached zero yet
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
