use std::io::Write;
use std::sync::Arc;

use knowroute::storage::{InMemoryDocumentStore, InMemoryPatternStore, StaticExternalSource};
use knowroute::{
    ContradictionSeverity, ContradictionType, KnowledgeRouter, Pattern, PatternProposal, PatternSource,
    PatternStore, ResolutionRecord, ResolutionStrategy, VocabularyConfig,
};

fn single_owner() -> Pattern {
    Pattern::new(
        "single-owner",
        "navigation",
        "Only one feature should own the navigation path",
        PatternSource::official("Point-Free docs"),
        5,
    )
    .unwrap()
}

fn co_owners() -> Pattern {
    Pattern::new(
        "co-owners",
        "navigation",
        "Both parent and child features are allowed to push onto the path",
        PatternSource::creator_blog("Creator blog"),
        4,
    )
    .unwrap()
}

fn setup_with(vocabulary: VocabularyConfig, existing: Vec<Pattern>) -> (KnowledgeRouter, Arc<InMemoryPatternStore>) {
    let patterns = Arc::new(InMemoryPatternStore::with_patterns(existing));
    let router = KnowledgeRouter::builder(
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(StaticExternalSource::new()),
        Arc::clone(&patterns) as Arc<dyn PatternStore>,
    )
    .vocabulary(vocabulary)
    .build()
    .unwrap();
    (router, patterns)
}

fn setup(existing: Vec<Pattern>) -> (KnowledgeRouter, Arc<InMemoryPatternStore>) {
    setup_with(VocabularyConfig::default(), existing)
}

#[tokio::test]
async fn opposing_credible_patterns_need_a_human() {
    let (router, patterns) = setup(vec![single_owner()]);

    let proposal = router.propose_pattern(co_owners()).await.unwrap();

    let PatternProposal::PendingReview(review) = proposal else {
        panic!("expected a pending review");
    };
    assert!(!review.approved);
    assert_eq!(review.contradictions.len(), 1);
    let contradiction = &review.contradictions[0];
    assert_eq!(contradiction.severity, ContradictionSeverity::Critical);
    assert_eq!(contradiction.strategy, ResolutionStrategy::RequireHumanDecision);
    assert_eq!(contradiction.contradiction_type, ContradictionType::ImplementationDetail);
    assert!(contradiction.involves("co-owners", "single-owner"));

    let point = &review.decision_points[0];
    assert_eq!(point.contradiction_id, contradiction.id);
    assert_eq!(point.options.len(), 2);
    assert_eq!(point.recommended_option().unwrap().pattern_name, "single-owner");

    // Nothing is stored until a human decides.
    assert_eq!(patterns.len(), 1);
}

#[tokio::test]
async fn detection_is_symmetric() {
    let (forward, _) = setup(vec![single_owner()]);
    let (backward, _) = setup(vec![co_owners()]);

    let a = forward.check_contradiction(&co_owners()).await.unwrap();
    let b = backward.check_contradiction(&single_owner()).await.unwrap();

    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!(a[0].severity, b[0].severity);
    assert_eq!(a[0].contradiction_type, b[0].contradiction_type);
    assert!(b[0].involves("single-owner", "co-owners"));
}

#[tokio::test]
async fn compatible_pattern_is_inserted() {
    let (router, patterns) = setup(vec![single_owner()]);
    let candidate = Pattern::new(
        "typed-destinations",
        "navigation",
        "Model destinations as an enum of child states",
        PatternSource::official("Point-Free docs"),
        5,
    )
    .unwrap();

    let proposal = router.propose_pattern(candidate).await.unwrap();

    assert!(proposal.is_inserted());
    assert!(proposal.review().approved);
    assert_eq!(patterns.len(), 2);
}

#[tokio::test]
async fn credibility_gap_resolves_automatically() {
    let (router, patterns) = setup(vec![single_owner()]);
    let weak = Pattern::new(
        "forum-tip",
        "navigation",
        "Both features can push; it has worked fine for me",
        PatternSource::community("Forum thread"),
        2,
    )
    .unwrap();

    let proposal = router.propose_pattern(weak).await.unwrap();

    assert!(proposal.is_inserted());
    let contradiction = &proposal.review().contradictions[0];
    assert_eq!(contradiction.severity, ContradictionSeverity::Warning);
    assert_eq!(contradiction.strategy, ResolutionStrategy::FollowHighestCredibility);
    // Canonical against opinion is a matter of authority, not content.
    assert_eq!(contradiction.contradiction_type, ContradictionType::SourceAuthority);
    assert_eq!(patterns.len(), 2);
}

#[tokio::test]
async fn commit_requires_every_pending_resolution() {
    let (router, patterns) = setup(vec![single_owner()]);
    let review = router.review_pattern(&co_owners()).await.unwrap();
    assert!(review.requires_human_decision());

    let err = router.commit_reviewed_pattern(&review, &[]).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(patterns.len(), 1);

    let id = review.contradictions[0].id;
    let keep_existing = ResolutionRecord::new(id, ResolutionStrategy::MarkDeprecated, "single-owner", "maintainer");
    assert!(!router.commit_reviewed_pattern(&review, &[keep_existing]).await.unwrap());
    assert_eq!(patterns.len(), 1);

    let accept = ResolutionRecord::new(id, ResolutionStrategy::RequireHumanDecision, "co-owners", "maintainer")
        .with_rationale("child features own their own stack");
    assert!(router.commit_reviewed_pattern(&review, &[accept]).await.unwrap());
    assert_eq!(patterns.len(), 2);
}

#[tokio::test]
async fn invalid_candidate_is_rejected_before_lookup() {
    let (router, _) = setup(vec![single_owner()]);
    let mut broken = co_owners();
    broken.credibility = 9;

    let err = router.propose_pattern(broken).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn safety_critical_domains_load_from_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        safety_critical_domains = ["navigation"]

        [domain_a]
        name = "tca"
        keywords = ["reducer", "store"]

        [domain_b]
        name = "visionos"
        keywords = ["groupsession", "shareplay"]
        "#
    )
    .unwrap();
    let vocabulary = VocabularyConfig::load(file.path()).unwrap();
    let (router, patterns) = setup_with(vocabulary, vec![single_owner()]);

    let weak = Pattern::new(
        "forum-tip",
        "navigation",
        "Both features can push onto the path",
        PatternSource::community("Forum thread"),
        2,
    )
    .unwrap();
    let proposal = router.propose_pattern(weak).await.unwrap();

    assert!(!proposal.is_inserted());
    assert_eq!(proposal.review().contradictions[0].severity, ContradictionSeverity::Critical);
    assert_eq!(patterns.len(), 1);
}
