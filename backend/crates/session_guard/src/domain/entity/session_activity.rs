//! Session Activity Entity

use serde::{Deserialize, Serialize};

/// Last qualifying activity of the signed-in session.
///
/// Exists only while a session is live; deleted at sign-out or forced expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActivityRecord {
    /// Last activity or explicit refresh (Unix timestamp ms)
    pub last_activity: i64,
    /// Whether the idle warning is displayed (informational)
    #[serde(default)]
    pub warning_shown: bool,
}

impl SessionActivityRecord {
    pub fn new(now_ms: i64) -> Self {
        Self {
            last_activity: now_ms,
            warning_shown: false,
        }
    }

    /// Milliseconds since the last recorded activity
    pub fn idle_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.last_activity).max(0)
    }
}
