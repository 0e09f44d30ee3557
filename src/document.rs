//! Collaborator data types: documents from the document store and answers
//! from the external documentation source.
//!
//! The router treats all of these as immutable input.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How strictly a document's guidance must be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementLevel {
    /// Background material.
    #[default]
    Informational,
    /// Recommended practice.
    Recommended,
    /// Must be followed.
    Required,
    /// Violations are defects.
    Critical,
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Informational => write!(f, "informational"),
            Self::Recommended => write!(f, "recommended"),
            Self::Required => write!(f, "required"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A document or pattern held by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Category (folder) the document lives in.
    pub category: String,
    /// Optional subcategory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Enforcement level.
    #[serde(default)]
    pub enforcement_level: EnforcementLevel,
}

impl Document {
    /// Creates a document with no tags and informational enforcement.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category: category.into(),
            subcategory: None,
            tags: BTreeSet::new(),
            enforcement_level: EnforcementLevel::Informational,
        }
    }

    /// Sets the subcategory.
    #[must_use]
    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    /// Adds tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the enforcement level.
    #[must_use]
    pub fn with_enforcement(mut self, level: EnforcementLevel) -> Self {
        self.enforcement_level = level;
        self
    }
}

/// What kind of material to ask the external source for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// API reference material.
    Reference,
    /// Conceptual guides.
    Concept,
    /// Sample code.
    Example,
}

/// How much prose the external source should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// A few sentences.
    Brief,
    /// A normal answer.
    Standard,
    /// Everything available.
    Detailed,
}

/// A citation attached to an external answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Cited title.
    pub title: String,
    /// Cited location.
    pub url: String,
    /// True for official, canonical documentation.
    #[serde(default)]
    pub authoritative: bool,
}

impl Citation {
    /// Creates a non-authoritative citation.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            authoritative: false,
        }
    }

    /// Marks the citation as authoritative.
    #[must_use]
    pub fn authoritative(mut self) -> Self {
        self.authoritative = true;
        self
    }
}

/// An answer from the external documentation source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExternalResult {
    /// Prose answer.
    pub content: String,
    /// Structured citations.
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl ExternalResult {
    /// Creates an answer without citations.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            citations: Vec::new(),
        }
    }

    /// Adds a citation.
    #[must_use]
    pub fn with_citation(mut self, citation: Citation) -> Self {
        self.citations.push(citation);
        self
    }

    /// Returns true if the answer carries no usable prose.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}
