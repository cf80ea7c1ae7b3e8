//! Key-Value Repository Implementations
//!
//! Records are stored as JSON under fixed, profile-scoped keys.

use std::sync::Arc;

use platform::storage::KeyValueStore;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::entity::{
    login_attempt::LoginAttemptRecord, session_activity::SessionActivityRecord,
};
use crate::domain::repository::{LoginAttemptRepository, SessionActivityRepository};
use crate::error::GuardResult;

/// Storage key of the login attempt record
pub const RATE_LIMIT_KEY: &str = "auth_rate_limit";
/// Storage key of the session activity record
pub const LAST_ACTIVITY_KEY: &str = "session_last_activity";

/// Key-value backed guard repository
#[derive(Clone)]
pub struct KvGuardStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvGuardStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> GuardResult<Option<T>> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> GuardResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)?;
        Ok(())
    }
}

// ============================================================================
// Login Attempt Repository Implementation
// ============================================================================

impl LoginAttemptRepository for KvGuardStore {
    fn load_attempts(&self) -> GuardResult<Option<LoginAttemptRecord>> {
        self.read(RATE_LIMIT_KEY)
    }

    fn save_attempts(&self, record: &LoginAttemptRecord) -> GuardResult<()> {
        self.write(RATE_LIMIT_KEY, record)
    }
}

// ============================================================================
// Session Activity Repository Implementation
// ============================================================================

impl SessionActivityRepository for KvGuardStore {
    fn load_activity(&self) -> GuardResult<Option<SessionActivityRecord>> {
        self.read(LAST_ACTIVITY_KEY)
    }

    fn save_activity(&self, record: &SessionActivityRecord) -> GuardResult<()> {
        self.write(LAST_ACTIVITY_KEY, record)
    }

    fn delete_activity(&self) -> GuardResult<()> {
        self.store.delete(LAST_ACTIVITY_KEY)?;
        Ok(())
    }
}
