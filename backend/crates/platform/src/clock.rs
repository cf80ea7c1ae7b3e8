//! Wall Clock
//!
//! Epoch-millisecond time source for persisted timestamps.

use std::fmt;

use chrono::Utc;
use tokio::time::Instant;

/// Source of "now" in Unix epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// System wall clock.
///
/// Keeps counting across a suspend, so timestamps persisted by one process
/// stay comparable with those read by the next.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock anchored to the tokio timer.
///
/// Starts at a given epoch value, then advances with `tokio::time::Instant`.
/// Persisted timestamps and scheduled timers therefore move together,
/// including under a paused test runtime. Not suspend-aware; production
/// code uses `SystemClock`.
#[derive(Clone, Copy)]
pub struct TokioClock {
    anchor_ms: i64,
    anchor: Instant,
}

impl TokioClock {
    /// Anchor at an explicit epoch value
    pub fn anchored_at(anchor_ms: i64) -> Self {
        Self {
            anchor_ms,
            anchor: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        let elapsed = Instant::now().saturating_duration_since(self.anchor);
        self.anchor_ms + elapsed.as_millis() as i64
    }
}

impl fmt::Debug for TokioClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioClock")
            .field("anchor_ms", &self.anchor_ms)
            .finish()
    }
}
