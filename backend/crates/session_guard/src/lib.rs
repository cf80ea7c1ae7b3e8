//! Session Guard - Client-Side Session Security
//!
//! Clean Architecture structure:
//! - `domain/` - Records, identity handles, repository and provider traits
//! - `application/` - Login limiter, idle supervisor, composite guard
//! - `infra/` - Key-value repositories, in-memory identity provider
//!
//! ## Features
//! - Local lockout after consecutive failed sign-ins, checked before the
//!   identity provider is contacted
//! - Idle timeout with a warning window and forced sign-out
//! - Activity coalescing and debounce so timers only move forward
//! - Optional activity sharing between guards on the same profile
//!
//! ## Failure Model
//! - Storage errors are logged and treated as an empty record
//! - Only identity provider errors (and `LockedOut`) reach callers

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::{
    GuardConfig, GuardState, IdlePolicy, LockoutPolicy, PeerChannel, SessionGuard,
    format_lockout_time,
};
pub use domain::{
    ActivityKind, IdentityProvider, IdlePhase, ProviderError, Session, SignUpInput, User,
};
pub use error::{GuardError, GuardResult};
pub use infra::{KvGuardStore, MemoryIdentityProvider};

#[cfg(test)]
mod tests;
