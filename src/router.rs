//! Knowledge router.
//!
//! Orchestrates a query end to end: classify, fan out to the planned
//! collaborators under one deadline, detect gaps, issue narrow gap-filling
//! calls, synthesize and score the answer, and cache it when it is good
//! enough. Collaborator failures are isolated per collaborator and only
//! surface as `NoResultsFound` when nothing usable came back.
//!
//! The router also fronts the administrative pattern path: proposals are
//! checked for contradictions before they reach the pattern store.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant as StdInstant;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::cache::ResponseCache;
use crate::classifier::{DomainClass, QueryClassifier};
use crate::config::RouterConfig;
use crate::contradiction::{Contradiction, ContradictionResolver, PatternReview, ResolutionRecord};
use crate::document::{Document, ExternalResult, SearchKind, Verbosity};
use crate::error::{CollaboratorError, RouteError, RouteResult, ValidationError};
use crate::gap::{Drafts, GapDetector, GapType, KnowledgeGap};
use crate::pattern::Pattern;
use crate::response::{
    AbsentSource, DetailLevel, ExpandedDetail, ResponseOrigin, ResponseWarning, SourceContribution,
    SynthesizedResponse,
};
use crate::scoring;
use crate::storage::{DocumentStore, ExternalSource, PatternStore};
use crate::synthesis::{DraftSection, Splice, Synthesizer};
use crate::text;
use crate::vocabulary::{Vocabulary, VocabularyConfig};

/// The two answering collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    /// The document store.
    Store,
    /// The external documentation source.
    External,
}

impl Collaborator {
    /// The other collaborator.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Store => Self::External,
            Self::External => Self::Store,
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => write!(f, "store"),
            Self::External => write!(f, "external"),
        }
    }
}

/// Which collaborators a query is sent to, and at what level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutPlan {
    /// Query the document store.
    pub store: bool,
    /// Query the external source.
    pub external: bool,
    /// Detail level used for the initial calls and synthesis.
    pub level: DetailLevel,
}

impl FanOutPlan {
    /// Plans the initial fan-out for a verdict.
    ///
    /// Unknown queries go to both collaborators at `summary` to bound cost.
    #[must_use]
    pub const fn for_verdict(domain: DomainClass, requested: DetailLevel) -> Self {
        match domain {
            DomainClass::APrimary => Self {
                store: true,
                external: false,
                level: requested,
            },
            DomainClass::BPrimary => Self {
                store: false,
                external: true,
                level: requested,
            },
            DomainClass::Hybrid => Self {
                store: true,
                external: true,
                level: requested,
            },
            DomainClass::Unknown => Self {
                store: true,
                external: true,
                level: DetailLevel::Summary,
            },
        }
    }

    /// Returns true if both collaborators are consulted.
    #[must_use]
    pub const fn is_dual(&self) -> bool {
        self.store && self.external
    }

    /// The consulted collaborator of a single-source plan.
    #[must_use]
    pub const fn single(&self) -> Option<Collaborator> {
        match (self.store, self.external) {
            (true, false) => Some(Collaborator::Store),
            (false, true) => Some(Collaborator::External),
            _ => None,
        }
    }

    /// Returns true if the plan consults `collaborator`.
    #[must_use]
    pub const fn includes(&self, collaborator: Collaborator) -> bool {
        match collaborator {
            Collaborator::Store => self.store,
            Collaborator::External => self.external,
        }
    }
}

/// Where gaps of each type are sent for filling, or `None` when the gap is
/// not filled under this plan.
#[must_use]
pub fn gap_fill_target(gap_type: GapType, plan: &FanOutPlan) -> Option<Collaborator> {
    let target = match gap_type {
        GapType::DomainAConcept => Collaborator::Store,
        GapType::DomainBConcept => Collaborator::External,
        GapType::Integration | GapType::Performance | GapType::ImplementationDepth => {
            plan.single()?.other()
        }
    };
    match plan.single() {
        Some(only) if only == target => None,
        _ => Some(target),
    }
}

/// Router counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouterStats {
    /// Queries received.
    pub total_queries: u64,
    /// Queries answered from cache.
    pub cache_hits: u64,
    /// Queries the document store contributed to.
    pub store_hits: u64,
    /// Queries the external source contributed to.
    pub external_hits: u64,
    /// Gap-filling calls issued.
    pub gap_fill_calls: u64,
    /// Queries that ended in `NoResultsFound`.
    pub no_results: u64,
    /// Mean wall time of live answers in milliseconds.
    pub average_response_ms: f64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    total_queries: AtomicU64,
    cache_hits: AtomicU64,
    store_hits: AtomicU64,
    external_hits: AtomicU64,
    gap_fill_calls: AtomicU64,
    no_results: AtomicU64,
    live_answers: AtomicU64,
    live_ms_total: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RouterStats {
        let live = self.live_answers.load(Ordering::Relaxed);
        let total_ms = self.live_ms_total.load(Ordering::Relaxed);
        #[allow(clippy::cast_precision_loss)]
        let average_response_ms = if live == 0 { 0.0 } else { total_ms as f64 / live as f64 };
        RouterStats {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            external_hits: self.external_hits.load(Ordering::Relaxed),
            gap_fill_calls: self.gap_fill_calls.load(Ordering::Relaxed),
            no_results: self.no_results.load(Ordering::Relaxed),
            average_response_ms,
        }
    }
}

/// Result of proposing a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatternProposal {
    /// Stored; any contradictions were resolvable automatically.
    Inserted(PatternReview),
    /// Not stored; a human must decide first.
    PendingReview(PatternReview),
}

impl PatternProposal {
    /// The review either way.
    #[must_use]
    pub const fn review(&self) -> &PatternReview {
        match self {
            Self::Inserted(review) | Self::PendingReview(review) => review,
        }
    }

    /// Returns true if the pattern was stored.
    #[must_use]
    pub const fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Builds a [`KnowledgeRouter`].
pub struct RouterBuilder {
    config: RouterConfig,
    vocabulary: VocabularyConfig,
    store: Arc<dyn DocumentStore>,
    external: Arc<dyn ExternalSource>,
    patterns: Arc<dyn PatternStore>,
}

impl RouterBuilder {
    /// Uses a router config.
    #[must_use]
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a vocabulary.
    #[must_use]
    pub fn vocabulary(mut self, vocabulary: VocabularyConfig) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Validates configuration and builds the router.
    ///
    /// # Errors
    ///
    /// Returns a config or validation error for an invalid config or
    /// vocabulary.
    pub fn build(self) -> RouteResult<KnowledgeRouter> {
        self.config.validate()?;
        let vocabulary = Arc::new(Vocabulary::new(self.vocabulary)?);

        Ok(KnowledgeRouter {
            classifier: QueryClassifier::new(Arc::clone(&vocabulary), self.config.classifier.clone()),
            gaps: GapDetector::new(Arc::clone(&vocabulary), self.config.gaps.clone()),
            resolver: ContradictionResolver::new(Arc::clone(&vocabulary)),
            synthesizer: Synthesizer::new(self.config.synthesis.clone()),
            cache: ResponseCache::new(self.config.cache.clone()),
            config: self.config,
            store: self.store,
            external: self.external,
            patterns: self.patterns,
            stats: StatsCounters::default(),
        })
    }
}

/// A rendered phase-one answer.
struct Draft {
    source: Collaborator,
    source_name: String,
    body: String,
    quality: f32,
    document_ids: Vec<String>,
}

/// Routes queries across the document store and the external source.
pub struct KnowledgeRouter {
    config: RouterConfig,
    classifier: QueryClassifier,
    gaps: GapDetector,
    resolver: ContradictionResolver,
    synthesizer: Synthesizer,
    cache: ResponseCache,
    store: Arc<dyn DocumentStore>,
    external: Arc<dyn ExternalSource>,
    patterns: Arc<dyn PatternStore>,
    stats: StatsCounters,
}

impl fmt::Debug for KnowledgeRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeRouter")
            .field("store", &self.store.name())
            .field("external", &self.external.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl KnowledgeRouter {
    /// Starts a builder with default config and vocabulary.
    #[must_use]
    pub fn builder(
        store: Arc<dyn DocumentStore>,
        external: Arc<dyn ExternalSource>,
        patterns: Arc<dyn PatternStore>,
    ) -> RouterBuilder {
        RouterBuilder {
            config: RouterConfig::default(),
            vocabulary: VocabularyConfig::default(),
            store,
            external,
            patterns,
        }
    }

    /// The active config.
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The classifier.
    #[must_use]
    pub const fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    /// The gap detector.
    #[must_use]
    pub const fn gap_detector(&self) -> &GapDetector {
        &self.gaps
    }

    /// The response cache.
    #[must_use]
    pub const fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> RouterStats {
        self.stats.snapshot()
    }

    /// Answers a query.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyQuery` for blank text and
    /// `RouteError::NoResultsFound` when no collaborator produced content.
    #[instrument(skip(self))]
    pub async fn query(&self, text: &str, level: DetailLevel) -> RouteResult<SynthesizedResponse> {
        let started = StdInstant::now();
        StatsCounters::bump(&self.stats.total_queries);

        if text::normalize(text).is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }

        // Holding the lease across the miss keeps concurrent identical
        // queries from computing and writing the same key twice.
        let _lease = self.cache.lease(text, level).await;
        if let Some(hit) = self.cache.get(text, level) {
            StatsCounters::bump(&self.stats.cache_hits);
            return Ok(hit);
        }

        let deadline = Instant::now() + self.config.timeout();
        let response = match self.answer(text, level, deadline).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_not_found() {
                    StatsCounters::bump(&self.stats.no_results);
                }
                return Err(err);
            }
        };

        if response.confidence >= self.config.cache.confidence_floor {
            self.cache.put(text, level, response.clone());
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        StatsCounters::bump(&self.stats.live_answers);
        self.stats.live_ms_total.fetch_add(elapsed_ms, Ordering::Relaxed);

        info!(
            domain = %response.domain.domain,
            sources = ?response.source_names(),
            confidence = response.confidence,
            gaps = response.gaps.len(),
            elapsed_ms,
            "answered query"
        );
        Ok(response)
    }

    async fn answer(&self, text: &str, level: DetailLevel, deadline: Instant) -> RouteResult<SynthesizedResponse> {
        let verdict = self.classifier.classify(text);
        let plan = FanOutPlan::for_verdict(verdict.domain, level);
        debug!(?plan, "planned fan-out");

        let query_terms = text::query_terms(text);

        let store_call = async {
            if plan.store {
                Some(bounded(self.store.name(), deadline, self.store.search(text)).await)
            } else {
                None
            }
        };
        let external_call = async {
            if plan.external {
                let call = self.external.search(text, plan.level.search_kind(), plan.level.verbosity());
                Some(bounded(self.external.name(), deadline, call).await)
            } else {
                None
            }
        };
        let (store_outcome, external_outcome) = tokio::join!(store_call, external_call);

        let mut absent = Vec::new();
        let mut drafts: Vec<Draft> = Vec::new();

        if let Some(outcome) = store_outcome {
            match outcome {
                Ok(docs) if !docs.is_empty() => {
                    drafts.push(self.store_draft(&docs, &query_terms, plan.level));
                }
                Ok(_) => absent.push(AbsentSource::new(self.store.name(), "no matching documents")),
                Err(err) => {
                    warn!(source = self.store.name(), error = %err, "document store call failed");
                    absent.push(AbsentSource::new(self.store.name(), err.to_string()));
                }
            }
        }
        if let Some(outcome) = external_outcome {
            match outcome {
                Ok(result) if !result.is_empty() => {
                    drafts.push(self.external_draft(&result, &query_terms, plan.level));
                }
                Ok(_) => absent.push(AbsentSource::new(self.external.name(), "empty answer")),
                Err(err) => {
                    warn!(source = self.external.name(), error = %err, "external source call failed");
                    absent.push(AbsentSource::new(self.external.name(), err.to_string()));
                }
            }
        }

        if drafts.is_empty() {
            return Err(RouteError::no_results(text));
        }
        for draft in &drafts {
            match draft.source {
                Collaborator::Store => StatsCounters::bump(&self.stats.store_hits),
                Collaborator::External => StatsCounters::bump(&self.stats.external_hits),
            }
        }

        let draft_text = |source: Collaborator| {
            drafts
                .iter()
                .find(|d| d.source == source)
                .map(|d| d.body.as_str())
        };
        let mut gaps = self.gaps.detect_gaps(
            Drafts::new(draft_text(Collaborator::Store), draft_text(Collaborator::External)),
            text,
        );

        let failed: Vec<Collaborator> = [Collaborator::Store, Collaborator::External]
            .into_iter()
            .filter(|c| plan.includes(*c) && !drafts.iter().any(|d| d.source == *c))
            .collect();
        let splices = self.fill_gaps(&gaps, &plan, &failed, deadline).await;

        gaps.retain(|gap| !splices.iter().any(|s| self.gaps.is_resolved_by(gap, &s.content)));

        let splice_qualities: Vec<f32> = splices.iter().map(|s| s.quality).collect();
        let bonus = scoring::gap_fill_bonus(&splice_qualities, self.config.gap_fill_bonus_cap);
        let source_confidences: Vec<f32> = drafts.iter().map(|d| d.quality).collect();
        let unresolved_high = gaps.iter().filter(|g| g.is_high()).count();
        let confidence = scoring::final_confidence(&source_confidences, bonus, unresolved_high);

        let sections: Vec<DraftSection> = drafts
            .iter()
            .map(|d| DraftSection::new(d.source_name.clone(), d.body.clone()))
            .collect();
        let content = self.synthesizer.compose(&sections, &splices);

        let mut contributing_sources: Vec<SourceContribution> = drafts
            .iter()
            .map(|d| SourceContribution::new(d.source_name.clone(), d.quality))
            .collect();
        contributing_sources.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut warnings = Vec::new();
        if plan.is_dual() && drafts.len() == 1 {
            warnings.push(ResponseWarning::SingleSource {
                source_name: drafts[0].source_name.clone(),
            });
        }
        if confidence < self.config.low_confidence_warning {
            warnings.push(ResponseWarning::LowConfidence { score: confidence });
        }

        let source_ids: Vec<String> = drafts.iter().flat_map(|d| d.document_ids.iter().cloned()).collect();
        let detail_available = if source_ids.is_empty() {
            Vec::new()
        } else {
            plan.level.higher()
        };

        Ok(SynthesizedResponse {
            content,
            contributing_sources,
            domain: verdict,
            gaps,
            detail_level: plan.level,
            confidence,
            origin: ResponseOrigin::Live,
            cache_info: None,
            warnings,
            absent_sources: absent,
            source_ids,
            detail_available,
        })
    }

    fn store_draft(&self, docs: &[Document], terms: &BTreeSet<String>, level: DetailLevel) -> Draft {
        let used = &docs[..docs.len().min(level.document_limit())];
        let quality = used
            .iter()
            .map(|doc| scoring::document_quality(doc, terms, self.classifier.vocabulary()))
            .fold(0.0_f32, f32::max);
        Draft {
            source: Collaborator::Store,
            source_name: self.store.name().to_string(),
            body: self.synthesizer.render_documents(used, level),
            quality,
            document_ids: used.iter().map(|doc| doc.id.clone()).collect(),
        }
    }

    fn external_draft(&self, result: &ExternalResult, terms: &BTreeSet<String>, level: DetailLevel) -> Draft {
        Draft {
            source: Collaborator::External,
            source_name: self.external.name().to_string(),
            body: self.synthesizer.render_external(result, level),
            quality: scoring::external_quality(result, terms),
            document_ids: Vec::new(),
        }
    }

    /// Issues at most one narrow call per target collaborator, concurrently,
    /// after the initial fan-out has resolved.
    async fn fill_gaps(
        &self,
        gaps: &[KnowledgeGap],
        plan: &FanOutPlan,
        failed: &[Collaborator],
        deadline: Instant,
    ) -> Vec<Splice> {
        let mut store_terms: Vec<String> = Vec::new();
        let mut external_terms: Vec<String> = Vec::new();
        for gap in gaps {
            let Some(target) = gap_fill_target(gap.gap_type, plan) else {
                continue;
            };
            if failed.contains(&target) {
                continue;
            }
            let terms = match target {
                Collaborator::Store => &mut store_terms,
                Collaborator::External => &mut external_terms,
            };
            if !terms.contains(&gap.term) {
                terms.push(gap.term.clone());
            }
        }
        if store_terms.is_empty() && external_terms.is_empty() {
            return Vec::new();
        }
        debug!(?store_terms, ?external_terms, "filling gaps");

        let store_query = store_terms.join(" ");
        let external_query = external_terms.join(" ");

        let store_call = async {
            if store_terms.is_empty() {
                return None;
            }
            StatsCounters::bump(&self.stats.gap_fill_calls);
            Some(bounded(self.store.name(), deadline, self.store.search(&store_query)).await)
        };
        let external_call = async {
            if external_terms.is_empty() {
                return None;
            }
            StatsCounters::bump(&self.stats.gap_fill_calls);
            let call = self
                .external
                .search(&external_query, SearchKind::Reference, Verbosity::Brief);
            Some(bounded(self.external.name(), deadline, call).await)
        };
        let (store_outcome, external_outcome) = tokio::join!(store_call, external_call);

        let mut splices = Vec::new();
        match store_outcome {
            Some(Ok(docs)) if !docs.is_empty() => {
                let terms = text::query_terms(&store_query);
                let used = &docs[..docs.len().min(DetailLevel::Summary.document_limit())];
                let quality = used
                    .iter()
                    .map(|doc| scoring::document_quality(doc, &terms, self.classifier.vocabulary()))
                    .fold(0.0_f32, f32::max);
                splices.push(Splice {
                    source_name: self.store.name().to_string(),
                    terms: store_terms.clone(),
                    content: self.synthesizer.render_documents(used, DetailLevel::Summary),
                    quality,
                });
            }
            Some(Err(err)) => warn!(source = self.store.name(), error = %err, "gap-fill call failed"),
            _ => {}
        }
        match external_outcome {
            Some(Ok(result)) if !result.is_empty() => {
                let terms = text::query_terms(&external_query);
                splices.push(Splice {
                    source_name: self.external.name().to_string(),
                    terms: external_terms.clone(),
                    content: self.synthesizer.render_external(&result, DetailLevel::Summary),
                    quality: scoring::external_quality(&result, &terms),
                });
            }
            Some(Err(err)) => warn!(source = self.external.name(), error = %err, "gap-fill call failed"),
            _ => {}
        }
        splices
    }

    /// Re-renders one store document at `level`.
    ///
    /// Responses list their document ids in `source_ids`; this drills into
    /// one of them without re-running the query. The lookup is bounded by
    /// the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` for a blank id,
    /// `RouteError::SourceNotFound` when the store has no such document and
    /// `RouteError::DocumentStore` when the lookup fails or times out.
    #[instrument(skip(self))]
    pub async fn expand(&self, source_id: &str, level: DetailLevel) -> RouteResult<ExpandedDetail> {
        let id = source_id.trim();
        if id.is_empty() {
            return Err(ValidationError::MissingField {
                field: "source_id".to_string(),
            }
            .into());
        }

        let deadline = Instant::now() + self.config.timeout();
        let document = bounded(self.store.name(), deadline, self.store.get(id))
            .await
            .map_err(RouteError::DocumentStore)?
            .ok_or_else(|| RouteError::source_not_found(id))?;

        debug!(source_id = id, level = %level, "expanded source");
        Ok(ExpandedDetail {
            content: self.synthesizer.render_document(&document, level),
            detail_available: level.higher(),
            source_id: document.id,
            title: document.title,
            level,
        })
    }

    /// Checks a candidate pattern against its domain.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid pattern and
    /// `RouteError::PatternStore` when the pattern store fails.
    pub async fn check_contradiction(&self, candidate: &Pattern) -> RouteResult<Vec<Contradiction>> {
        Ok(self.review_pattern(candidate).await?.contradictions)
    }

    /// Builds the full review (contradictions and decision points) for a
    /// candidate pattern.
    ///
    /// # Errors
    ///
    /// See [`KnowledgeRouter::check_contradiction`].
    pub async fn review_pattern(&self, candidate: &Pattern) -> RouteResult<PatternReview> {
        candidate.validate()?;
        let existing = self
            .patterns
            .patterns_by_domain(&candidate.domain)
            .await
            .map_err(RouteError::PatternStore)?;
        Ok(self.resolver.review(&existing, candidate))
    }

    /// Proposes a pattern, storing it unless a human decision is required.
    ///
    /// # Errors
    ///
    /// See [`KnowledgeRouter::check_contradiction`].
    #[instrument(skip(self, candidate), fields(pattern = %candidate.name, domain = %candidate.domain))]
    pub async fn propose_pattern(&self, candidate: Pattern) -> RouteResult<PatternProposal> {
        let review = self.review_pattern(&candidate).await?;
        if review.requires_human_decision() {
            warn!(pending = review.pending().count(), "pattern held for human decision");
            return Ok(PatternProposal::PendingReview(review));
        }

        self.patterns
            .insert_pattern(candidate)
            .await
            .map_err(RouteError::PatternStore)?;
        info!(contradictions = review.contradictions.len(), "pattern inserted");
        Ok(PatternProposal::Inserted(review))
    }

    /// Stores a reviewed candidate once every human decision is recorded.
    ///
    /// Returns `Ok(false)` when a resolution chose an existing pattern over
    /// the candidate.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` when a pending contradiction
    /// has no resolution, and `RouteError::PatternStore` when the insert
    /// fails.
    pub async fn commit_reviewed_pattern(
        &self,
        review: &PatternReview,
        resolutions: &[ResolutionRecord],
    ) -> RouteResult<bool> {
        let mut candidate_prevails = true;
        for contradiction in review.pending() {
            let Some(record) = resolutions.iter().find(|r| r.contradiction_id == contradiction.id) else {
                return Err(ValidationError::MissingField {
                    field: format!("resolution for contradiction {}", contradiction.id),
                }
                .into());
            };
            if record.chosen_pattern != review.candidate.name {
                candidate_prevails = false;
            }
        }

        if !candidate_prevails {
            info!(pattern = %review.candidate.name, "reviewed pattern rejected");
            return Ok(false);
        }

        self.patterns
            .insert_pattern(review.candidate.clone())
            .await
            .map_err(RouteError::PatternStore)?;
        info!(pattern = %review.candidate.name, "reviewed pattern inserted");
        Ok(true)
    }
}

/// Runs a collaborator call until `deadline`. A timeout reports how long
/// this call waited, not the configured budget.
async fn bounded<T, F>(source_name: &str, deadline: Instant, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    let started = Instant::now();
    tokio::time::timeout_at(deadline, call)
        .await
        .unwrap_or_else(|_| {
            Err(CollaboratorError::Timeout {
                source_name: source_name.to_string(),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            })
        })
}
