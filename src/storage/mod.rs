//! Collaborator interfaces and in-memory backends.
//!
//! The traits describe what the router consumes; the in-memory backends
//! are usable for embedded deployments and tests.

pub mod memory;
mod traits;

pub use memory::{InMemoryDocumentStore, InMemoryPatternStore, StaticExternalSource};
pub use traits::{DocumentStore, ExternalSource, PatternStore};
