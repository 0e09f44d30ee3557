//! Patterns: named recommendations with provenance and credibility.
//!
//! A pattern is what the contradiction resolver compares. Its source carries
//! both a kind (where the guidance was published) and an authority level
//! used to break credibility ties.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RouteResult, ValidationError};

/// Lowest allowed credibility.
pub const MIN_CREDIBILITY: u8 = 1;

/// Highest allowed credibility.
pub const MAX_CREDIBILITY: u8 = 5;

/// Credibility at or above which a pattern counts as high-credibility.
pub const HIGH_CREDIBILITY: u8 = 4;

/// Where a pattern's guidance was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    /// Official framework documentation.
    OfficialDoc,
    /// A blog post by the framework's authors.
    CreatorBlog,
    /// Guidance derived from analysing other sources.
    DerivedAnalysis,
    /// Community posts and answers.
    Community,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OfficialDoc => write!(f, "official-doc"),
            Self::CreatorBlog => write!(f, "creator-blog"),
            Self::DerivedAnalysis => write!(f, "derived-analysis"),
            Self::Community => write!(f, "community"),
        }
    }
}

/// Coarse authority classification used as a credibility tie-breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    /// The canonical reference.
    Canonical,
    /// A recognised expert.
    Expert,
    /// Derived from other sources.
    Derived,
    /// Personal opinion.
    Opinion,
}

impl AuthorityLevel {
    /// Numeric rank, higher is more authoritative.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Canonical => 3,
            Self::Expert => 2,
            Self::Derived => 1,
            Self::Opinion => 0,
        }
    }

    /// Absolute rank distance between two levels.
    #[must_use]
    pub const fn distance(self, other: Self) -> u8 {
        self.rank().abs_diff(other.rank())
    }
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canonical => write!(f, "canonical"),
            Self::Expert => write!(f, "expert"),
            Self::Derived => write!(f, "derived"),
            Self::Opinion => write!(f, "opinion"),
        }
    }
}

/// Provenance of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSource {
    /// Human-readable source name.
    pub name: String,
    /// Publication kind.
    pub source_type: SourceType,
    /// Authority level.
    pub authority: AuthorityLevel,
}

impl PatternSource {
    /// Creates a source.
    #[must_use]
    pub fn new(name: impl Into<String>, source_type: SourceType, authority: AuthorityLevel) -> Self {
        Self {
            name: name.into(),
            source_type,
            authority,
        }
    }

    /// Official documentation, canonical authority.
    #[must_use]
    pub fn official(name: impl Into<String>) -> Self {
        Self::new(name, SourceType::OfficialDoc, AuthorityLevel::Canonical)
    }

    /// Creator blog, expert authority.
    #[must_use]
    pub fn creator_blog(name: impl Into<String>) -> Self {
        Self::new(name, SourceType::CreatorBlog, AuthorityLevel::Expert)
    }

    /// Community post, opinion authority.
    #[must_use]
    pub fn community(name: impl Into<String>) -> Self {
        Self::new(name, SourceType::Community, AuthorityLevel::Opinion)
    }
}

/// A recommendation the resolver can compare against others.
///
/// # Examples
///
/// ```
/// use knowroute::{Pattern, PatternSource};
///
/// let pattern = Pattern::new(
///     "single-writer",
///     "shared-state",
///     "Use only one writer per shared value",
///     PatternSource::official("Point-Free docs"),
///     5,
/// )
/// .unwrap();
/// assert!(pattern.is_high_credibility());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Pattern name.
    pub name: String,
    /// Pattern domain (e.g. `shared-state`).
    pub domain: String,
    /// The recommendation text compared for contradictions.
    pub recommendation: String,
    /// Provenance.
    pub source: PatternSource,
    /// Credibility in `1..=5`.
    pub credibility: u8,
}

impl Pattern {
    /// Creates a validated pattern.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::CredibilityOutOfRange` for credibility
    /// outside `1..=5` and `ValidationError::MissingField` for an empty
    /// name, domain, recommendation or source name.
    pub fn new(
        name: impl Into<String>,
        domain: impl Into<String>,
        recommendation: impl Into<String>,
        source: PatternSource,
        credibility: u8,
    ) -> RouteResult<Self> {
        let pattern = Self {
            name: name.into(),
            domain: domain.into(),
            recommendation: recommendation.into(),
            source,
            credibility,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Validates fields.
    ///
    /// # Errors
    ///
    /// See [`Pattern::new`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_CREDIBILITY..=MAX_CREDIBILITY).contains(&self.credibility) {
            return Err(ValidationError::CredibilityOutOfRange {
                value: self.credibility,
            });
        }
        for (field, value) in [
            ("name", &self.name),
            ("domain", &self.domain),
            ("recommendation", &self.recommendation),
            ("source.name", &self.source.name),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Returns true at credibility 4 or 5.
    #[must_use]
    pub const fn is_high_credibility(&self) -> bool {
        self.credibility >= HIGH_CREDIBILITY
    }

    /// Returns true if both patterns belong to the same domain.
    #[must_use]
    pub fn shares_domain(&self, other: &Self) -> bool {
        self.domain.trim().eq_ignore_ascii_case(other.domain.trim())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] from {} ({}, credibility {})",
            self.name, self.domain, self.source.name, self.source.authority, self.credibility
        )
    }
}
