//! Identity Handles
//!
//! Opaque user and session handles issued by the identity provider.
//! The guard never inspects them beyond the session id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

/// Provider-issued session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: Uuid,
    pub user: User,
    /// Issue time (Unix timestamp ms)
    pub issued_at_ms: i64,
}

impl Session {
    pub fn new(user: User, issued_at_ms: i64) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user,
            issued_at_ms,
        }
    }
}

/// Sign up input passed through to the provider
#[derive(Debug, Clone)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    /// Optional profile name
    pub display_name: Option<String>,
}
