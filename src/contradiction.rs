//! Contradiction detection between patterns.
//!
//! Contradictions are explicit objects, not hidden errors. When a proposed
//! pattern's recommendation opposes an existing one in the same domain, the
//! resolver records the contradiction, rates it, picks a resolution strategy
//! and builds the human-facing decision point.
//!
//! Detection is deliberately eager: an ambiguous antonym match is reported
//! as a warning instead of being dropped.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::pattern::Pattern;
use crate::vocabulary::{AntonymKind, AntonymPair, Vocabulary};

/// Authority rank distance at which a contradiction is about authority.
pub const AUTHORITY_GAP: u8 = 2;

/// Unique identifier for a contradiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContradictionId(Uuid);

impl ContradictionId {
    /// Creates a new random contradiction ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContradictionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContradictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the two patterns disagree about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContradictionType {
    /// Structure or ownership.
    Architectural,
    /// A usage detail.
    ImplementationDetail,
    /// Sources of very different authority disagree.
    SourceAuthority,
}

impl From<AntonymKind> for ContradictionType {
    fn from(kind: AntonymKind) -> Self {
        match kind {
            AntonymKind::Architectural => Self::Architectural,
            AntonymKind::ImplementationDetail => Self::ImplementationDetail,
        }
    }
}

impl fmt::Display for ContradictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Architectural => write!(f, "architectural"),
            Self::ImplementationDetail => write!(f, "implementation-detail"),
            Self::SourceAuthority => write!(f, "source-authority"),
        }
    }
}

/// How urgent a contradiction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionSeverity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Blocks automatic acceptance.
    Critical,
}

impl fmt::Display for ContradictionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// How a contradiction should be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Keep the more credible pattern.
    FollowHighestCredibility,
    /// Merge both into one recommendation.
    Synthesize,
    /// A human must decide.
    RequireHumanDecision,
    /// Retire the losing pattern.
    MarkDeprecated,
}

impl ResolutionStrategy {
    /// The strategy the resolver picks for a severity.
    #[must_use]
    pub const fn for_severity(severity: ContradictionSeverity) -> Self {
        match severity {
            ContradictionSeverity::Critical => Self::RequireHumanDecision,
            ContradictionSeverity::Warning => Self::FollowHighestCredibility,
            ContradictionSeverity::Info => Self::Synthesize,
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FollowHighestCredibility => write!(f, "follow-highest-credibility"),
            Self::Synthesize => write!(f, "synthesize"),
            Self::RequireHumanDecision => write!(f, "require-human-decision"),
            Self::MarkDeprecated => write!(f, "mark-deprecated"),
        }
    }
}

/// An antonym pair that matched the two recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntonymMatch {
    /// The matching pair.
    pub pair: AntonymPair,
    /// False when either text holds both sides of the pair.
    pub clear: bool,
}

/// Two patterns that disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    /// Identifier.
    pub id: ContradictionId,
    /// The existing pattern.
    pub existing: Pattern,
    /// The proposed pattern.
    pub candidate: Pattern,
    /// What they disagree about.
    pub contradiction_type: ContradictionType,
    /// Severity.
    pub severity: ContradictionSeverity,
    /// Resolution strategy.
    pub strategy: ResolutionStrategy,
    /// Antonym evidence.
    pub matches: Vec<AntonymMatch>,
    /// When detected.
    pub detected_at: DateTime<Utc>,
}

impl Contradiction {
    /// Returns true if a human must decide.
    #[must_use]
    pub fn requires_human_decision(&self) -> bool {
        self.strategy == ResolutionStrategy::RequireHumanDecision
    }

    /// Returns true if the contradiction involves the two named patterns,
    /// in either role.
    #[must_use]
    pub fn involves(&self, a: &str, b: &str) -> bool {
        (self.existing.name == a && self.candidate.name == b)
            || (self.existing.name == b && self.candidate.name == a)
    }
}

impl fmt::Display for Contradiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} contradiction between '{}' and '{}' ({})",
            self.severity, self.contradiction_type, self.existing.name, self.candidate.name, self.strategy
        )
    }
}

/// One choice offered to the human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    /// Source name.
    pub label: String,
    /// The pattern's recommendation.
    pub description: String,
    /// Credibility and authority summary.
    pub consequence: String,
    /// Pattern the option stands for.
    pub pattern_name: String,
}

/// Human-facing question for one contradiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPoint {
    /// Contradiction this decides.
    pub contradiction_id: ContradictionId,
    /// The question.
    pub question: String,
    /// One option per conflicting pattern (existing first).
    pub options: Vec<DecisionOption>,
    /// Index into `options` of the recommended choice.
    pub recommended: usize,
}

impl DecisionPoint {
    /// The recommended option.
    #[must_use]
    pub fn recommended_option(&self) -> Option<&DecisionOption> {
        self.options.get(self.recommended)
    }
}

/// Outcome of checking a candidate against its domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReview {
    /// The proposed pattern.
    pub candidate: Pattern,
    /// True when no contradiction was found.
    pub approved: bool,
    /// Every contradiction found.
    pub contradictions: Vec<Contradiction>,
    /// One decision point per contradiction.
    pub decision_points: Vec<DecisionPoint>,
}

impl PatternReview {
    /// Returns true if any contradiction needs a human decision.
    #[must_use]
    pub fn requires_human_decision(&self) -> bool {
        self.contradictions.iter().any(Contradiction::requires_human_decision)
    }

    /// Contradictions that need a human decision.
    pub fn pending(&self) -> impl Iterator<Item = &Contradiction> {
        self.contradictions.iter().filter(|c| c.requires_human_decision())
    }
}

/// A human's decision on one contradiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    /// Contradiction decided.
    pub contradiction_id: ContradictionId,
    /// Strategy applied.
    pub strategy: ResolutionStrategy,
    /// Name of the pattern that prevails.
    pub chosen_pattern: String,
    /// Who decided.
    pub decided_by: String,
    /// Optional rationale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// When decided.
    pub decided_at: DateTime<Utc>,
}

impl ResolutionRecord {
    /// Creates a record timestamped now.
    #[must_use]
    pub fn new(
        contradiction_id: ContradictionId,
        strategy: ResolutionStrategy,
        chosen_pattern: impl Into<String>,
        decided_by: impl Into<String>,
    ) -> Self {
        Self {
            contradiction_id,
            strategy,
            chosen_pattern: chosen_pattern.into(),
            decided_by: decided_by.into(),
            rationale: None,
            decided_at: Utc::now(),
        }
    }

    /// Adds a rationale.
    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Detects and rates contradictions using the vocabulary's antonym table.
#[derive(Debug, Clone)]
pub struct ContradictionResolver {
    vocabulary: Arc<Vocabulary>,
}

impl ContradictionResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Finds contradictions between `candidate` and every existing pattern
    /// in its domain.
    #[must_use]
    pub fn detect(&self, existing: &[Pattern], candidate: &Pattern) -> Vec<Contradiction> {
        existing
            .iter()
            .filter(|p| p.shares_domain(candidate) && *p != candidate)
            .filter_map(|p| self.compare(p, candidate))
            .collect()
    }

    fn compare(&self, existing: &Pattern, candidate: &Pattern) -> Option<Contradiction> {
        let a = existing.recommendation.to_lowercase();
        let b = candidate.recommendation.to_lowercase();

        let matches: Vec<AntonymMatch> = self
            .vocabulary
            .antonyms()
            .iter()
            .filter_map(|pair| antonym_match(pair, &a, &b))
            .collect();
        let first = matches.first()?;

        let severity = self.severity(existing, candidate, &matches);
        let contradiction_type =
            if existing.source.authority.distance(candidate.source.authority) >= AUTHORITY_GAP {
                ContradictionType::SourceAuthority
            } else {
                first.pair.kind.into()
            };
        let strategy = ResolutionStrategy::for_severity(severity);

        let contradiction = Contradiction {
            id: ContradictionId::new(),
            existing: existing.clone(),
            candidate: candidate.clone(),
            contradiction_type,
            severity,
            strategy,
            matches,
            detected_at: Utc::now(),
        };

        if contradiction.requires_human_decision() {
            warn!(
                existing = %existing.name,
                candidate = %candidate.name,
                domain = %candidate.domain,
                "contradiction requires human decision"
            );
        } else {
            debug!(contradiction = %contradiction, "contradiction detected");
        }
        Some(contradiction)
    }

    fn severity(&self, a: &Pattern, b: &Pattern, matches: &[AntonymMatch]) -> ContradictionSeverity {
        if self.vocabulary.is_safety_critical(&a.domain) {
            return ContradictionSeverity::Critical;
        }
        if !matches.iter().any(|m| m.clear) {
            return ContradictionSeverity::Warning;
        }
        match (a.is_high_credibility(), b.is_high_credibility()) {
            (true, true) => ContradictionSeverity::Critical,
            (true, false) | (false, true) => ContradictionSeverity::Warning,
            (false, false) => ContradictionSeverity::Info,
        }
    }

    /// Builds the decision point for a contradiction.
    #[must_use]
    pub fn decision_point(&self, contradiction: &Contradiction) -> DecisionPoint {
        let patterns = [&contradiction.existing, &contradiction.candidate];
        let options = patterns
            .iter()
            .map(|p| DecisionOption {
                label: p.source.name.clone(),
                description: p.recommendation.clone(),
                consequence: format!(
                    "credibility {}/5, {} authority ({})",
                    p.credibility, p.source.authority, p.source.source_type
                ),
                pattern_name: p.name.clone(),
            })
            .collect();

        DecisionPoint {
            contradiction_id: contradiction.id,
            question: format!(
                "'{}' and '{}' give opposing {} guidance for {}. Which should be followed?",
                contradiction.existing.name,
                contradiction.candidate.name,
                contradiction.contradiction_type,
                contradiction.candidate.domain
            ),
            options,
            recommended: recommended_index(&contradiction.existing, &contradiction.candidate),
        }
    }

    /// Detects contradictions and builds the review for a candidate.
    #[must_use]
    pub fn review(&self, existing: &[Pattern], candidate: &Pattern) -> PatternReview {
        let contradictions = self.detect(existing, candidate);
        let decision_points = contradictions.iter().map(|c| self.decision_point(c)).collect();
        PatternReview {
            candidate: candidate.clone(),
            approved: contradictions.is_empty(),
            contradictions,
            decision_points,
        }
    }
}

fn antonym_match(pair: &AntonymPair, a: &str, b: &str) -> Option<AntonymMatch> {
    let left = pair.left.to_lowercase();
    let right = pair.right.to_lowercase();

    let (a_left, a_right) = (a.contains(&left), a.contains(&right));
    let (b_left, b_right) = (b.contains(&left), b.contains(&right));

    if !((a_left && b_right) || (a_right && b_left)) {
        return None;
    }
    let ambiguous = (a_left && a_right) || (b_left && b_right);
    Some(AntonymMatch {
        pair: pair.clone(),
        clear: !ambiguous,
    })
}

/// Index 0 is the existing pattern, 1 the candidate.
fn recommended_index(existing: &Pattern, candidate: &Pattern) -> usize {
    let key = |p: &Pattern| (p.credibility, p.source.authority.rank());
    if key(candidate) > key(existing) {
        1
    } else {
        0
    }
}
