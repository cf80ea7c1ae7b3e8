//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Wall clock anchored to the tokio timer
//! - Profile-scoped key-value storage (memory and file backends)
//! - Cancellable timers and second-resolution countdowns

pub mod clock;
pub mod storage;
pub mod timer;
