//! Query domain classification.
//!
//! Scores free text against each domain's keywords and heuristics and turns
//! the two blended scores into a single verdict. Classification is a pure
//! function of the text and the vocabulary: it never fails and keeps no
//! state between calls.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClassifierConfig;
use crate::scoring;
use crate::text;
use crate::vocabulary::{DomainSide, Vocabulary};

/// Which knowledge area a query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainClass {
    /// Domain A only.
    APrimary,
    /// Domain B only.
    BPrimary,
    /// Both domains.
    Hybrid,
    /// Not enough signal.
    Unknown,
}

impl DomainClass {
    /// The primary side, for single-domain verdicts.
    #[must_use]
    pub const fn primary_side(self) -> Option<DomainSide> {
        match self {
            Self::APrimary => Some(DomainSide::A),
            Self::BPrimary => Some(DomainSide::B),
            Self::Hybrid | Self::Unknown => None,
        }
    }
}

impl fmt::Display for DomainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::APrimary => write!(f, "a-primary"),
            Self::BPrimary => write!(f, "b-primary"),
            Self::Hybrid => write!(f, "hybrid"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Per-domain scoring detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    /// Blended score in [0, 1].
    pub score: f32,
    /// Raw weighted keyword matches before normalisation.
    pub raw_weight: f32,
    /// Keywords matched exactly.
    pub exact_terms: Vec<String>,
    /// Keywords matched by partial token overlap.
    pub partial_terms: Vec<String>,
    /// Names of heuristics that fired.
    pub heuristics: Vec<String>,
}

impl DomainScore {
    /// All matched keywords, exact first.
    #[must_use]
    pub fn matched_terms(&self) -> Vec<String> {
        self.exact_terms
            .iter()
            .chain(self.partial_terms.iter())
            .cloned()
            .collect()
    }
}

/// The classifier's decision for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainVerdict {
    /// The decided domain.
    pub domain: DomainClass,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// Domain A detail.
    pub domain_a: DomainScore,
    /// Domain B detail.
    pub domain_b: DomainScore,
}

impl DomainVerdict {
    /// A verdict with no signal at all.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            domain: DomainClass::Unknown,
            confidence: 0.0,
            domain_a: DomainScore::default(),
            domain_b: DomainScore::default(),
        }
    }

    /// Detail for one side.
    #[must_use]
    pub const fn score(&self, side: DomainSide) -> &DomainScore {
        match side {
            DomainSide::A => &self.domain_a,
            DomainSide::B => &self.domain_b,
        }
    }
}

/// Classifies queries against a shared vocabulary.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    vocabulary: Arc<Vocabulary>,
    config: ClassifierConfig,
}

impl QueryClassifier {
    /// Creates a classifier.
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>, config: ClassifierConfig) -> Self {
        Self { vocabulary, config }
    }

    /// The vocabulary in use.
    #[must_use]
    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Classifies a query.
    #[must_use]
    pub fn classify(&self, query: &str) -> DomainVerdict {
        let normalized = text::normalize(query);
        if normalized.is_empty() {
            return DomainVerdict::unknown();
        }

        let domain_a = self.score_side(&normalized, DomainSide::A);
        let domain_b = self.score_side(&normalized, DomainSide::B);
        let (domain, confidence) = self.decide(&normalized, &domain_a, &domain_b);

        debug!(
            domain = %domain,
            confidence,
            score_a = domain_a.score,
            score_b = domain_b.score,
            "classified query"
        );

        DomainVerdict {
            domain,
            confidence: confidence.clamp(0.0, 1.0),
            domain_a,
            domain_b,
        }
    }

    fn score_side(&self, normalized: &str, side: DomainSide) -> DomainScore {
        let query_tokens: Vec<String> = text::tokens(normalized)
            .into_iter()
            .map(|t| t.trim_start_matches('@').to_string())
            .collect();

        let mut detail = DomainScore::default();
        for keyword in &self.vocabulary.domain(side).keywords {
            if text::contains_term(normalized, keyword) {
                detail.raw_weight += self.config.exact_match_weight;
                detail.exact_terms.push(keyword.clone());
            } else if partial_overlap(keyword, &query_tokens) {
                detail.raw_weight += self.config.partial_match_weight;
                detail.partial_terms.push(keyword.clone());
            }
        }

        let mut bonuses = Vec::new();
        for heuristic in self.vocabulary.heuristics(side) {
            if heuristic.regex.is_match(normalized) {
                bonuses.push(heuristic.bonus);
                detail.heuristics.push(heuristic.name.clone());
            }
        }

        let keyword = scoring::keyword_score(detail.raw_weight, &self.config);
        let heuristic = scoring::heuristic_score(&bonuses);
        detail.score = scoring::blend(keyword, heuristic, &self.config);
        detail
    }

    fn decide(&self, normalized: &str, a: &DomainScore, b: &DomainScore) -> (DomainClass, f32) {
        let t_single = self.config.t_single;
        let t_dual = self.config.t_dual;
        let (sa, sb) = (a.score, b.score);

        if sa >= t_single && sb < t_dual {
            return (DomainClass::APrimary, sa);
        }
        if sb >= t_single && sa < t_dual {
            return (DomainClass::BPrimary, sb);
        }

        if sa >= t_dual && sb >= t_dual {
            #[allow(clippy::float_cmp)]
            let tied = sa == sb;
            // A tie from keywords alone is an even mix of both domains. The
            // tie rule only arbitrates when heuristics shaped the scores.
            let heuristic_tie = !a.heuristics.is_empty() || !b.heuristics.is_empty();
            if tied && heuristic_tie && sa < t_single {
                return if a.raw_weight > b.raw_weight {
                    (DomainClass::APrimary, sa)
                } else if b.raw_weight > a.raw_weight {
                    (DomainClass::BPrimary, sb)
                } else {
                    (DomainClass::Unknown, sa)
                };
            }
            return (DomainClass::Hybrid, (sa + sb) / 2.0);
        }

        // One domain present but below t_single, the other absent.
        if sa >= t_dual {
            return (DomainClass::APrimary, sa);
        }
        if sb >= t_dual {
            return (DomainClass::BPrimary, sb);
        }

        let fallback = sa.max(sb);
        let hints = self.vocabulary.secondary_hints();
        if text::contains_any(normalized, &hints.domain_b) {
            (DomainClass::BPrimary, fallback)
        } else if text::contains_any(normalized, &hints.domain_a) {
            (DomainClass::APrimary, fallback)
        } else if text::contains_any(normalized, &hints.hybrid) {
            (DomainClass::Hybrid, fallback)
        } else {
            (DomainClass::Unknown, fallback)
        }
    }
}

fn partial_overlap(keyword: &str, query_tokens: &[String]) -> bool {
    let keyword_tokens: Vec<String> = text::tokens(keyword)
        .into_iter()
        .map(|t| t.trim_start_matches('@').to_string())
        .filter(|t| t.chars().count() >= 3)
        .collect();

    if keyword_tokens.len() == 1 {
        let kw = &keyword_tokens[0];
        return query_tokens.iter().any(|q| q == kw || q.starts_with(kw.as_str()));
    }
    keyword_tokens.iter().any(|kw| query_tokens.iter().any(|q| q == kw))
}
