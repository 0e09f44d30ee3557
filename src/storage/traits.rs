//! Collaborator traits consumed by the router.
//!
//! The router never talks to a concrete backend. Real deployments inject a
//! full-text document store, a documentation service client and a pattern
//! table; tests inject the in-memory implementations from
//! [`crate::storage::memory`] or their own fakes.

use async_trait::async_trait;

use crate::document::{Document, ExternalResult, SearchKind, Verbosity};
use crate::error::CollaboratorError;
use crate::pattern::Pattern;

/// Full-text searchable document repository (domain A).
///
/// # Concurrency
/// Implementations must be safe to call concurrently from independent
/// queries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name used in source attribution and logs.
    fn name(&self) -> &str {
        "document-store"
    }

    /// Searches for documents; results are treated as relevance-descending.
    async fn search(&self, query: &str) -> Result<Vec<Document>, CollaboratorError>;

    /// Lists every document in a category.
    async fn by_category(&self, category: &str) -> Result<Vec<Document>, CollaboratorError>;

    /// Fetches one document by id.
    async fn get(&self, id: &str) -> Result<Option<Document>, CollaboratorError>;
}

/// Independent documentation provider (domain B).
#[async_trait]
pub trait ExternalSource: Send + Sync {
    /// Name used in source attribution and logs.
    fn name(&self) -> &str {
        "external-docs"
    }

    /// Asks the provider a question.
    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        verbosity: Verbosity,
    ) -> Result<ExternalResult, CollaboratorError>;
}

/// Pattern table read by the contradiction resolver.
///
/// Insertion is an administrative path and is never called concurrently
/// by the router.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// All patterns in a domain.
    async fn patterns_by_domain(&self, domain: &str) -> Result<Vec<Pattern>, CollaboratorError>;

    /// Stores a pattern.
    async fn insert_pattern(&self, pattern: Pattern) -> Result<(), CollaboratorError>;
}
