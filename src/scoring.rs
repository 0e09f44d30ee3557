//! Confidence arithmetic.
//!
//! All weighted sums, caps and bonuses used by the classifier and the router
//! live here so they can be tuned and property-tested apart from routing.

use std::collections::BTreeSet;

use crate::config::ClassifierConfig;
use crate::document::{Document, EnforcementLevel, ExternalResult};
use crate::text;
use crate::vocabulary::Vocabulary;

/// Bonus for a document whose category belongs to a routed domain.
pub const DOMAIN_CATEGORY_BONUS: f32 = 0.1;

/// Bonus for a document with `required` or `critical` enforcement.
pub const ENFORCEMENT_BONUS: f32 = 0.1;

/// Bonus for an external answer carrying an authoritative citation.
pub const AUTHORITATIVE_CITATION_BONUS: f32 = 0.15;

/// Per-splice bonus factor applied to the splice's own match quality.
pub const SPLICE_BONUS_FACTOR: f32 = 0.1;

/// Penalty for each high-severity gap left unresolved.
pub const UNRESOLVED_HIGH_GAP_PENALTY: f32 = 0.05;

/// Maximum combined heuristic contribution before blending.
pub const HEURISTIC_CAP: f32 = 1.0;

/// Normalised keyword score: `min(1, weighted / max_possible)`.
#[must_use]
pub fn keyword_score(weighted_matches: f32, config: &ClassifierConfig) -> f32 {
    if config.max_possible_weight <= 0.0 {
        return 0.0;
    }
    (weighted_matches / config.max_possible_weight).clamp(0.0, 1.0)
}

/// Sum of fired heuristic bonuses, capped at [`HEURISTIC_CAP`].
#[must_use]
pub fn heuristic_score(bonuses: &[f32]) -> f32 {
    bonuses.iter().copied().map(|b| b.max(0.0)).sum::<f32>().min(HEURISTIC_CAP)
}

/// Blends keyword and heuristic scores with fixed weights.
#[must_use]
pub fn blend(keyword: f32, heuristic: f32, config: &ClassifierConfig) -> f32 {
    (keyword * config.keyword_weight + heuristic * config.heuristic_weight).clamp(0.0, 1.0)
}

/// Match quality of a document against the query terms.
///
/// Term overlap with title, content and tags, plus a bonus for a
/// domain-tagged category and for high enforcement.
#[must_use]
pub fn document_quality(doc: &Document, terms: &BTreeSet<String>, vocabulary: &Vocabulary) -> f32 {
    let mut haystack = String::with_capacity(doc.title.len() + doc.content.len() + 64);
    haystack.push_str(&doc.title);
    haystack.push(' ');
    haystack.push_str(&doc.content);
    for tag in &doc.tags {
        haystack.push(' ');
        haystack.push_str(tag);
    }

    let mut score = text::overlap_ratio(terms, &haystack);
    if vocabulary.side_for_category(&doc.category).is_some() {
        score += DOMAIN_CATEGORY_BONUS;
    }
    if matches!(doc.enforcement_level, EnforcementLevel::Required | EnforcementLevel::Critical) {
        score += ENFORCEMENT_BONUS;
    }
    score.clamp(0.0, 1.0)
}

/// Match quality of an external answer against the query terms.
#[must_use]
pub fn external_quality(result: &ExternalResult, terms: &BTreeSet<String>) -> f32 {
    let mut score = text::overlap_ratio(terms, &result.content);
    if result.citations.iter().any(|c| c.authoritative) {
        score += AUTHORITATIVE_CITATION_BONUS;
    }
    score.clamp(0.0, 1.0)
}

/// Total confidence gained from gap-fill splices, capped at `cap`.
#[must_use]
pub fn gap_fill_bonus(splice_qualities: &[f32], cap: f32) -> f32 {
    splice_qualities
        .iter()
        .map(|q| q.clamp(0.0, 1.0) * SPLICE_BONUS_FACTOR)
        .sum::<f32>()
        .min(cap.max(0.0))
}

/// Final response confidence.
///
/// Never exceeds the best contributing source plus the gap-fill bonus.
#[must_use]
pub fn final_confidence(source_confidences: &[f32], bonus: f32, unresolved_high_gaps: usize) -> f32 {
    let best = source_confidences.iter().copied().fold(0.0_f32, f32::max);
    #[allow(clippy::cast_precision_loss)]
    let penalty = unresolved_high_gaps as f32 * UNRESOLVED_HIGH_GAP_PENALTY;
    (best + bonus - penalty).clamp(0.0, 1.0)
}
