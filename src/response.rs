//! Response types returned to callers.
//!
//! Every response says where it came from (live or cache), how confident the
//! router is, which sources contributed, and what is still missing.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::DomainVerdict;
use crate::document::{SearchKind, Verbosity};
use crate::gap::KnowledgeGap;

/// Requested verbosity tier of a synthesized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailLevel {
    /// A short preview.
    Summary,
    /// Preview plus key points.
    #[default]
    Pattern,
    /// Key points plus code examples.
    Example,
    /// Complete documents.
    FullContext,
}

impl DetailLevel {
    /// Maximum number of documents synthesized at this level.
    #[must_use]
    pub const fn document_limit(self) -> usize {
        match self {
            Self::Summary => 1,
            Self::Pattern => 2,
            Self::Example => 3,
            Self::FullContext => 5,
        }
    }

    /// Kind of material to request from the external source.
    #[must_use]
    pub const fn search_kind(self) -> SearchKind {
        match self {
            Self::Summary => SearchKind::Reference,
            Self::Pattern => SearchKind::Concept,
            Self::Example | Self::FullContext => SearchKind::Example,
        }
    }

    /// Verbosity to request from the external source.
    #[must_use]
    pub const fn verbosity(self) -> Verbosity {
        match self {
            Self::Summary => Verbosity::Brief,
            Self::Pattern | Self::Example => Verbosity::Standard,
            Self::FullContext => Verbosity::Detailed,
        }
    }

    /// Levels above this one, lowest first.
    #[must_use]
    pub fn higher(self) -> Vec<Self> {
        [Self::Summary, Self::Pattern, Self::Example, Self::FullContext]
            .into_iter()
            .filter(|level| *level > self)
            .collect()
    }

    /// Stable name used in cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Pattern => "pattern",
            Self::Example => "example",
            Self::FullContext => "full-context",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source that contributed to a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContribution {
    /// Source name.
    pub source_name: String,
    /// Match quality of this source's contribution.
    pub confidence: f32,
}

impl SourceContribution {
    /// Creates a contribution.
    #[must_use]
    pub fn new(source_name: impl Into<String>, confidence: f32) -> Self {
        Self {
            source_name: source_name.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Where a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrigin {
    /// Computed for this call.
    Live,
    /// Reused from the cache.
    Cache,
}

impl fmt::Display for ResponseOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// Cache metadata attached to reused responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Always true when present.
    pub is_from_cache: bool,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// Hits including the original write.
    pub hit_count: u64,
}

/// Non-fatal conditions attached to a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseWarning {
    /// Final confidence is below the warning threshold.
    LowConfidence {
        /// The confidence.
        score: f32,
    },
    /// Only one source answered a query that needed two.
    SingleSource {
        /// The source that answered.
        source_name: String,
    },
}

impl fmt::Display for ResponseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowConfidence { score } => write!(f, "low confidence ({score:.2})"),
            Self::SingleSource { source_name } => write!(f, "answered by {source_name} only"),
        }
    }
}

/// A collaborator that was planned but did not contribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsentSource {
    /// Source name.
    pub source_name: String,
    /// Why it is missing.
    pub reason: String,
}

impl AbsentSource {
    /// Creates an absent-source record.
    #[must_use]
    pub fn new(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// The router's answer to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedResponse {
    /// Synthesized content.
    pub content: String,
    /// Contributing sources, most confident first.
    pub contributing_sources: Vec<SourceContribution>,
    /// The classifier's verdict.
    pub domain: DomainVerdict,
    /// Gaps that remain after gap filling.
    pub gaps: Vec<KnowledgeGap>,
    /// Detail level produced.
    pub detail_level: DetailLevel,
    /// Final confidence in [0, 1].
    pub confidence: f32,
    /// Live or cache.
    pub origin: ResponseOrigin,
    /// Present when served from cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<CacheInfo>,
    /// Non-fatal warnings.
    #[serde(default)]
    pub warnings: Vec<ResponseWarning>,
    /// Planned sources that did not contribute.
    #[serde(default)]
    pub absent_sources: Vec<AbsentSource>,
    /// Ids of the store documents rendered into the answer, in order.
    #[serde(default)]
    pub source_ids: Vec<String>,
    /// Levels those documents can still be expanded to.
    #[serde(default)]
    pub detail_available: Vec<DetailLevel>,
}

impl SynthesizedResponse {
    /// Returns true if served from cache.
    #[must_use]
    pub fn is_from_cache(&self) -> bool {
        self.origin == ResponseOrigin::Cache
    }

    /// Contributing source names in order.
    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.contributing_sources.iter().map(|s| s.source_name.as_str()).collect()
    }

    /// Returns true if a low-confidence warning is attached.
    #[must_use]
    pub fn is_low_confidence(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ResponseWarning::LowConfidence { .. }))
    }

    /// Returns true if a source can be expanded past the served level.
    #[must_use]
    pub fn has_more_details(&self) -> bool {
        !self.source_ids.is_empty() && !self.detail_available.is_empty()
    }

    /// Marks the response as served from cache.
    #[must_use]
    pub fn into_cached(mut self, created_at: DateTime<Utc>, hit_count: u64) -> Self {
        self.origin = ResponseOrigin::Cache;
        self.cache_info = Some(CacheInfo {
            is_from_cache: true,
            created_at,
            hit_count,
        });
        self
    }
}

/// One document re-rendered at a requested level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedDetail {
    /// Document id.
    pub source_id: String,
    /// Document title.
    pub title: String,
    /// Level rendered.
    pub level: DetailLevel,
    /// Rendered content.
    pub content: String,
    /// Levels still above this one.
    pub detail_available: Vec<DetailLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> SynthesizedResponse {
        SynthesizedResponse {
            content: "answer".to_string(),
            contributing_sources: vec![SourceContribution::new("docs", 0.8)],
            domain: DomainVerdict::unknown(),
            gaps: Vec::new(),
            detail_level: DetailLevel::Summary,
            confidence: 0.8,
            origin: ResponseOrigin::Live,
            cache_info: None,
            warnings: vec![ResponseWarning::LowConfidence { score: 0.4 }],
            absent_sources: Vec::new(),
            source_ids: vec!["tca-001".to_string()],
            detail_available: DetailLevel::Summary.higher(),
        }
    }

    #[test]
    fn test_detail_level_mappings() {
        assert_eq!(DetailLevel::Summary.document_limit(), 1);
        assert_eq!(DetailLevel::FullContext.document_limit(), 5);
        assert_eq!(DetailLevel::Pattern.search_kind(), SearchKind::Concept);
        assert_eq!(DetailLevel::Example.verbosity(), Verbosity::Standard);
        assert_eq!(DetailLevel::FullContext.to_string(), "full-context");
        assert!(DetailLevel::Summary < DetailLevel::FullContext);
    }

    #[test]
    fn test_into_cached_sets_metadata() {
        let created = Utc::now();
        let cached = response().into_cached(created, 2);
        assert!(cached.is_from_cache());
        let info = cached.cache_info.unwrap();
        assert!(info.is_from_cache);
        assert_eq!(info.hit_count, 2);
        assert_eq!(info.created_at, created);
    }

    #[test]
    fn test_contribution_confidence_clamped() {
        assert!((SourceContribution::new("x", 1.4).confidence - 1.0).abs() < f32::EPSILON);
        assert_eq!(SourceContribution::new("x", -0.2).confidence, 0.0);
    }

    #[test]
    fn test_serialized_shape_exposes_origin() {
        let json = serde_json::to_value(response()).unwrap();
        assert_eq!(json["origin"], "live");
        assert_eq!(json["detail_level"], "summary");
        assert_eq!(json["warnings"][0]["kind"], "low_confidence");
        assert!(json.get("cache_info").is_none());
    }

    #[test]
    fn test_higher_levels() {
        assert_eq!(
            DetailLevel::Pattern.higher(),
            vec![DetailLevel::Example, DetailLevel::FullContext]
        );
        assert!(DetailLevel::FullContext.higher().is_empty());
    }

    #[test]
    fn test_more_details_needs_an_expandable_source() {
        let mut r = response();
        assert!(r.has_more_details());
        r.source_ids.clear();
        assert!(!r.has_more_details());
    }

    #[test]
    fn test_low_confidence_flag() {
        let r = response();
        assert!(r.is_low_confidence());
        assert_eq!(r.source_names(), vec!["docs"]);
    }
}
