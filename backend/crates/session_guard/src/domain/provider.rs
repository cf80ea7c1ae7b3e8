//! Identity Provider Trait
//!
//! The external platform that owns credentials and session issuance.

use thiserror::Error;
use tokio::sync::watch;

use crate::domain::entity::identity::{Session, SignUpInput};

/// Opaque identity provider failure, passed through to callers unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Credentials rejected
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Request rejected for another reason (message from the provider)
    #[error("{0}")]
    Rejected(String),

    /// Provider could not be reached
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Identity provider trait
#[trait_variant::make(IdentityProvider: Send)]
pub trait LocalIdentityProvider {
    /// Authenticate with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError>;

    /// Register a new account; `None` when the provider defers the session
    async fn sign_up(&self, input: &SignUpInput) -> Result<Option<Session>, ProviderError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Session as last issued or restored, `None` when signed out
    fn current_session(&self) -> Option<Session>;

    /// Session-change notifications; the receiver starts at the current session
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
}
