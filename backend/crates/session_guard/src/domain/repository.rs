//! Repository Traits
//!
//! Interfaces for record persistence. Implementation is in infrastructure layer.
//! Both records are singletons per browser profile.

use crate::domain::entity::{
    login_attempt::LoginAttemptRecord, session_activity::SessionActivityRecord,
};
use crate::error::GuardResult;

/// Login attempt record repository
pub trait LoginAttemptRepository: Send + Sync {
    /// Load the record, `None` when never written
    fn load_attempts(&self) -> GuardResult<Option<LoginAttemptRecord>>;

    /// Overwrite the record
    fn save_attempts(&self, record: &LoginAttemptRecord) -> GuardResult<()>;
}

/// Session activity record repository
pub trait SessionActivityRepository: Send + Sync {
    /// Load the record, `None` when no session is tracked
    fn load_activity(&self) -> GuardResult<Option<SessionActivityRecord>>;

    /// Overwrite the record
    fn save_activity(&self, record: &SessionActivityRecord) -> GuardResult<()>;

    /// Delete the record
    fn delete_activity(&self) -> GuardResult<()>;
}
