//! Storage backends
//!
//! Only the in-memory implementations live in-tree; real deployments plug
//! their own [`crate::services`] implementations into the server builder.

pub mod in_memory;

pub use in_memory::{InMemoryProfileStore, InMemoryTaskStore, StaticTokenVerifier};
