//! Knowledge gap detection.
//!
//! Compares the drafts fetched for a query against what the query asked
//! about. A gap is either a domain keyword the query used that a draft never
//! mentions, or a structural shortfall (state, testing, integration,
//! performance, depth) across all drafts together.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GapConfig;
use crate::text;
use crate::vocabulary::{DomainSide, Vocabulary};

/// What kind of knowledge is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapType {
    /// A domain A concept is missing.
    DomainAConcept,
    /// A domain B concept is missing.
    DomainBConcept,
    /// The drafts never connect the two domains.
    Integration,
    /// Performance guidance is missing.
    Performance,
    /// The drafts are too thin for an implementation request.
    ImplementationDepth,
}

impl GapType {
    /// The concept gap type for a domain side.
    #[must_use]
    pub const fn concept(side: DomainSide) -> Self {
        match side {
            DomainSide::A => Self::DomainAConcept,
            DomainSide::B => Self::DomainBConcept,
        }
    }
}

impl fmt::Display for GapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DomainAConcept => write!(f, "domain-a-concept"),
            Self::DomainBConcept => write!(f, "domain-b-concept"),
            Self::Integration => write!(f, "integration"),
            Self::Performance => write!(f, "performance"),
            Self::ImplementationDepth => write!(f, "implementation-depth"),
        }
    }
}

/// How much a gap matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSeverity {
    /// Nice to have.
    Low,
    /// Noticeably incomplete.
    Medium,
    /// The answer is misleading without it.
    High,
}

impl fmt::Display for GapSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Which check produced a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapCheck {
    /// A query keyword missing from one draft.
    Term,
    /// State-management vocabulary missing.
    State,
    /// Testing vocabulary missing.
    Testing,
    /// Neither draft speaks both domains.
    Integration,
    /// Performance vocabulary missing.
    Performance,
    /// Combined drafts below the length floor.
    Depth,
}

/// A missing piece of knowledge in the fetched drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGap {
    /// The missing term (lowercase).
    pub term: String,
    /// Gap type.
    pub gap_type: GapType,
    /// Severity.
    pub severity: GapSeverity,
    /// Human-readable explanation.
    pub context: String,
    /// Check that produced the gap.
    pub check: GapCheck,
}

impl KnowledgeGap {
    /// Creates a gap.
    #[must_use]
    pub fn new(
        term: impl Into<String>,
        gap_type: GapType,
        severity: GapSeverity,
        context: impl Into<String>,
        check: GapCheck,
    ) -> Self {
        Self {
            term: term.into(),
            gap_type,
            severity,
            context: context.into(),
            check,
        }
    }

    /// Returns true for high-severity gaps.
    #[must_use]
    pub fn is_high(&self) -> bool {
        self.severity == GapSeverity::High
    }
}

impl fmt::Display for KnowledgeGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} gap '{}' ({}): {}", self.severity, self.term, self.gap_type, self.context)
    }
}

/// Drafts fetched for one query, keyed by the collaborator that produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drafts<'a> {
    /// Document store draft (domain A source).
    pub store: Option<&'a str>,
    /// External source draft (domain B source).
    pub external: Option<&'a str>,
}

impl<'a> Drafts<'a> {
    /// Creates a draft set.
    #[must_use]
    pub const fn new(store: Option<&'a str>, external: Option<&'a str>) -> Self {
        Self { store, external }
    }

    fn present(&self) -> impl Iterator<Item = &'a str> {
        self.store.into_iter().chain(self.external).filter(|d| !d.trim().is_empty())
    }

    /// Returns true if neither draft carries text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

/// Detects gaps between a query and its drafts.
#[derive(Debug, Clone)]
pub struct GapDetector {
    vocabulary: Arc<Vocabulary>,
    config: GapConfig,
}

impl GapDetector {
    /// Creates a detector.
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>, config: GapConfig) -> Self {
        Self { vocabulary, config }
    }

    /// Detects gaps, sorted by severity descending then term ascending.
    ///
    /// Never fails; an empty query or no drafts yields no gaps.
    #[must_use]
    pub fn detect_gaps(&self, drafts: Drafts<'_>, query: &str) -> Vec<KnowledgeGap> {
        let query_norm = text::normalize(query);
        if query_norm.is_empty() || drafts.is_empty() {
            return Vec::new();
        }

        let mut found = Vec::new();

        // Each draft is checked for the other domain's vocabulary.
        for (draft, source_side) in [(drafts.store, DomainSide::A), (drafts.external, DomainSide::B)] {
            let Some(draft) = draft.filter(|d| !d.trim().is_empty()) else {
                continue;
            };
            let missing_side = source_side.other();
            let draft_norm = text::normalize(draft);
            for keyword in &self.vocabulary.domain(missing_side).keywords {
                if text::contains_term(&query_norm, keyword) && !text::contains_term(&draft_norm, keyword) {
                    found.push(KnowledgeGap::new(
                        text::normalize(keyword),
                        GapType::concept(missing_side),
                        GapSeverity::Medium,
                        format!(
                            "{} answer does not mention '{keyword}'",
                            self.vocabulary.domain(source_side).name
                        ),
                        GapCheck::Term,
                    ));
                }
            }
        }

        let combined: Vec<&str> = drafts.present().collect();
        let combined_norm = text::normalize(&combined.join("\n"));
        let gaps = self.vocabulary.gaps();

        if text::contains_any(&query_norm, &gaps.state_triggers)
            && !text::contains_any(&combined_norm, &gaps.state_terms)
        {
            found.push(KnowledgeGap::new(
                "state management",
                GapType::DomainAConcept,
                GapSeverity::High,
                "query asks about state but no answer covers state management",
                GapCheck::State,
            ));
        }

        if text::contains_any(&query_norm, &gaps.test_triggers)
            && !text::contains_any(&combined_norm, &gaps.test_terms)
        {
            found.push(KnowledgeGap::new(
                "testing",
                GapType::DomainAConcept,
                GapSeverity::Medium,
                "query asks about testing but no answer shows how to test",
                GapCheck::Testing,
            ));
        }

        if self.implies_integration(&query_norm)
            && !drafts.present().any(|d| self.speaks_both_domains(&text::normalize(d)))
        {
            found.push(KnowledgeGap::new(
                "integration",
                GapType::Integration,
                GapSeverity::Medium,
                "no answer connects both domains",
                GapCheck::Integration,
            ));
        }

        if text::contains_any(&query_norm, &gaps.performance_triggers)
            && !text::contains_any(&combined_norm, &gaps.performance_terms)
        {
            found.push(KnowledgeGap::new(
                "performance",
                GapType::Performance,
                GapSeverity::Medium,
                "query asks about performance but no answer addresses it",
                GapCheck::Performance,
            ));
        }

        let combined_chars: usize = combined.iter().map(|d| d.chars().count()).sum();
        if combined_chars < self.config.min_response_chars
            && text::contains_any(&query_norm, &gaps.example_triggers)
        {
            found.push(KnowledgeGap::new(
                "implementation",
                GapType::ImplementationDepth,
                GapSeverity::High,
                format!(
                    "example requested but answers total {combined_chars} chars (< {})",
                    self.config.min_response_chars
                ),
                GapCheck::Depth,
            ));
        }

        let gaps = dedup_and_sort(found);
        debug!(count = gaps.len(), "detected knowledge gaps");
        gaps
    }

    /// Returns true if `content` supplies what `gap` reported missing.
    #[must_use]
    pub fn is_resolved_by(&self, gap: &KnowledgeGap, content: &str) -> bool {
        let norm = text::normalize(content);
        let gaps = self.vocabulary.gaps();
        match gap.check {
            GapCheck::Term => text::contains_term(&norm, &gap.term),
            GapCheck::State => text::contains_any(&norm, &gaps.state_terms),
            GapCheck::Testing => text::contains_any(&norm, &gaps.test_terms),
            GapCheck::Integration => self.speaks_both_domains(&norm),
            GapCheck::Performance => text::contains_any(&norm, &gaps.performance_terms),
            GapCheck::Depth => content.chars().count() >= self.config.min_response_chars,
        }
    }

    fn implies_integration(&self, query_norm: &str) -> bool {
        if text::contains_any(query_norm, &self.vocabulary.gaps().integration_triggers) {
            return true;
        }
        [DomainSide::A, DomainSide::B]
            .iter()
            .all(|side| text::contains_any(query_norm, &self.vocabulary.domain(*side).keywords))
    }

    fn speaks_both_domains(&self, draft_norm: &str) -> bool {
        [DomainSide::A, DomainSide::B]
            .iter()
            .all(|side| text::contains_any(draft_norm, &self.vocabulary.domain(*side).signature_terms))
    }
}

fn dedup_and_sort(found: Vec<KnowledgeGap>) -> Vec<KnowledgeGap> {
    let mut unique: BTreeMap<(String, GapType), KnowledgeGap> = BTreeMap::new();
    for gap in found {
        let key = (gap.term.clone(), gap.gap_type);
        match unique.get(&key) {
            Some(existing) if existing.severity >= gap.severity => {}
            _ => {
                unique.insert(key, gap);
            }
        }
    }

    let mut gaps: Vec<KnowledgeGap> = unique.into_values().collect();
    gaps.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.term.cmp(&b.term)));
    gaps
}
