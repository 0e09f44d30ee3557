//! # knowroute - Knowledge Routing & Reconciliation Engine
//!
//! knowroute routes developer questions about two overlapping technical
//! domains to the knowledge source that can answer them, notices when an
//! answer is incomplete, fills the gap from the other source, and reconciles
//! contradictory guidance before it reaches a user. Repeated questions are
//! served from a cache that validates itself on every read.
//!
//! ## Core Concepts
//!
//! - **DomainVerdict**: which domain a query belongs to, with per-domain scores
//! - **KnowledgeGap**: something the query asked about that no draft covers
//! - **SynthesizedResponse**: the answer, with confidence, attribution and origin
//! - **Contradiction**: two patterns in one domain that recommend opposite things
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use knowroute::{DetailLevel, KnowledgeRouter};
//! use knowroute::storage::{InMemoryDocumentStore, InMemoryPatternStore, StaticExternalSource};
//!
//! let router = KnowledgeRouter::builder(
//!     Arc::new(InMemoryDocumentStore::new()),
//!     Arc::new(StaticExternalSource::new()),
//!     Arc::new(InMemoryPatternStore::new()),
//! )
//! .build()?;
//!
//! let answer = router.query("How do I share state across a GroupSession?", DetailLevel::Pattern).await?;
//! println!("{} ({:.2}, from {})", answer.content, answer.confidence, answer.origin);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Shared foundations
pub mod config;
pub mod error;
pub mod scoring;
pub mod text;
pub mod vocabulary;

// Data types
pub mod document;
pub mod pattern;
pub mod response;

// Decision logic
pub mod classifier;
pub mod contradiction;
pub mod gap;
pub mod synthesis;

// Orchestration
pub mod cache;
pub mod router;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use cache::{CacheKey, CacheStats, ResponseCache};
pub use classifier::{DomainClass, DomainScore, DomainVerdict, QueryClassifier};
pub use config::{CacheConfig, ClassifierConfig, GapConfig, RouterConfig, SynthesisConfig};
pub use contradiction::{
    Contradiction, ContradictionId, ContradictionResolver, ContradictionSeverity, ContradictionType,
    DecisionOption, DecisionPoint, PatternReview, ResolutionRecord, ResolutionStrategy,
};
pub use document::{Citation, Document, EnforcementLevel, ExternalResult, SearchKind, Verbosity};
pub use error::{CollaboratorError, ConfigError, RouteError, RouteResult, ValidationError};
pub use gap::{Drafts, GapDetector, GapSeverity, GapType, KnowledgeGap};
pub use pattern::{AuthorityLevel, Pattern, PatternSource, SourceType};
pub use response::{
    AbsentSource, CacheInfo, DetailLevel, ExpandedDetail, ResponseOrigin, ResponseWarning,
    SourceContribution, SynthesizedResponse,
};
pub use router::{Collaborator, FanOutPlan, KnowledgeRouter, PatternProposal, RouterBuilder, RouterStats};
pub use storage::{DocumentStore, ExternalSource, PatternStore};
pub use vocabulary::{AntonymKind, AntonymPair, DomainSide, DomainVocabulary, Vocabulary, VocabularyConfig};
