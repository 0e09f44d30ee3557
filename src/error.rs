//! Error types for knowroute.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions. Collaborator failures are isolated by the router and
//! only surface as `NoResultsFound` when nothing usable came back.

use std::path::PathBuf;

use thiserror::Error;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Query text cannot be empty")]
    EmptyQuery,

    #[error("Credibility {value} is out of range [1, 5]")]
    CredibilityOutOfRange {
        value: u8,
    },

    #[error("Confidence value {value} is out of range [0.0, 1.0]")]
    ConfidenceOutOfRange {
        value: f32,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid heuristic pattern '{pattern}': {reason}")]
    InvalidHeuristic {
        pattern: String,
        reason: String,
    },
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for '{field}': {reason}")]
    Invalid {
        field: String,
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by external collaborators (document store, external source,
/// pattern store).
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        source_name: String,
        reason: String,
    },

    #[error("{source_name} timed out after {elapsed_ms}ms")]
    Timeout {
        source_name: String,
        elapsed_ms: u64,
    },

    #[error("Backend error: {0}")]
    Backend(String),
}

impl CollaboratorError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for knowroute.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No results found for query '{query}'")]
    NoResultsFound {
        query: String,
    },

    #[error("Source '{source_id}' not found")]
    SourceNotFound {
        source_id: String,
    },

    #[error("Document store error: {0}")]
    DocumentStore(#[source] CollaboratorError),

    #[error("Pattern store error: {0}")]
    PatternStore(#[source] CollaboratorError),
}

impl RouteError {
    /// Creates a not-found error for an expansion target.
    #[must_use]
    pub fn source_not_found(source_id: impl Into<String>) -> Self {
        Self::SourceNotFound {
            source_id: source_id.into(),
        }
    }

    /// Creates a no-results error for the given query.
    #[must_use]
    pub fn no_results(query: impl Into<String>) -> Self {
        Self::NoResultsFound {
            query: query.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if no collaborator produced usable content, or an
    /// expansion target does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NoResultsFound { .. } | Self::SourceNotFound { .. })
    }

    /// Returns true if this error is retryable.
    ///
    /// `NoResultsFound` is never retried automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::DocumentStore(e) | Self::PatternStore(e) => matches!(
                e,
                CollaboratorError::Unavailable { .. } | CollaboratorError::Timeout { .. }
            ),
            Self::Validation(_) | Self::Config(_) | Self::NoResultsFound { .. } | Self::SourceNotFound { .. } => {
                false
            }
        }
    }
}

/// Result type alias for knowroute operations.
pub type RouteResult<T> = Result<T, RouteError>;
