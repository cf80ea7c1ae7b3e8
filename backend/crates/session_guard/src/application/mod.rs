//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod guard;
pub mod idle_supervisor;
pub mod login_limiter;
pub mod peer_sync;

// Re-exports
pub use config::{GuardConfig, IdlePolicy, LockoutPolicy};
pub use guard::{GuardState, SessionGuard};
pub use idle_supervisor::IdleSupervisor;
pub use login_limiter::{LoginLimiter, format_lockout_time};
pub use peer_sync::{ActivitySignal, PeerChannel};
