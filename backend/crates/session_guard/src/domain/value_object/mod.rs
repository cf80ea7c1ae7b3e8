//! Value Object Module

pub mod activity_kind;
pub mod idle_phase;
