//! Domain Layer
//!
//! Contains entities, value objects, repository and provider traits.

pub mod entity;
pub mod provider;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    identity::{Session, SignUpInput, User},
    login_attempt::LoginAttemptRecord,
    session_activity::SessionActivityRecord,
};
pub use provider::{IdentityProvider, ProviderError};
pub use repository::{LoginAttemptRepository, SessionActivityRepository};
pub use value_object::{activity_kind::ActivityKind, idle_phase::IdlePhase};
