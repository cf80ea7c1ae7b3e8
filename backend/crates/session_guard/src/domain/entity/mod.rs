//! Entity Module

pub mod identity;
pub mod login_attempt;
pub mod session_activity;
