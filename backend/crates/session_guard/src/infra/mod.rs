//! Infrastructure Layer
//!
//! Storage-backed repositories and the in-process identity provider.

pub mod kv;
pub mod memory_provider;

pub use kv::KvGuardStore;
pub use memory_provider::MemoryIdentityProvider;
