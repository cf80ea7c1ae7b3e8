//! Guard Error Types
//!
//! Only `LockedOut` and `Provider` reach callers. Storage errors and forced
//! expiry failures are logged and absorbed where they occur.

use platform::storage::StorageError;
use thiserror::Error;

use crate::domain::provider::ProviderError;

/// Guard result type alias
pub type GuardResult<T> = Result<T, GuardError>;

/// Guard error variants
#[derive(Debug, Error)]
pub enum GuardError {
    /// Sign-in attempted while locked out; the provider was not contacted
    #[error("Too many failed login attempts. Please try again in {minutes_remaining} minutes.")]
    LockedOut { minutes_remaining: u64 },

    /// Persisted record could not be read or written
    #[error("Session storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// Persisted record exists but does not parse
    #[error("Stored record is corrupt: {0}")]
    CorruptRecord(#[from] serde_json::Error),

    /// Identity provider failure
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Sign-out issued by the idle timeout failed
    #[error("Forced sign-out after idle timeout failed: {0}")]
    ForcedExpiry(ProviderError),
}

impl GuardError {
    pub fn is_locked_out(&self) -> bool {
        matches!(self, GuardError::LockedOut { .. })
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            GuardError::StorageUnavailable(e) => {
                tracing::warn!(error = %e, "Session storage unavailable, using defaults");
            }
            GuardError::CorruptRecord(e) => {
                tracing::warn!(error = %e, "Discarding corrupt session record");
            }
            GuardError::LockedOut { minutes_remaining } => {
                tracing::warn!(minutes_remaining, "Sign-in blocked by local lockout");
            }
            GuardError::ForcedExpiry(e) => {
                tracing::error!(error = %e, "Forced sign-out failed, local state cleared");
            }
            GuardError::Provider(e) => {
                tracing::debug!(error = %e, "Identity provider error");
            }
        }
    }
}
