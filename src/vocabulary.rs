//! Domain vocabulary: the loadable tables that drive classification, gap
//! detection and contradiction detection.
//!
//! `VocabularyConfig` is the serialisable description (TOML or builder);
//! `Vocabulary` is the validated form with compiled heuristic regexes that
//! the scorers share behind an `Arc`.

use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RouteError, RouteResult, ValidationError};

/// Upper bound for a single heuristic bonus.
pub const MAX_HEURISTIC_BONUS: f32 = 0.3;

/// Which of the two routed knowledge areas a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainSide {
    /// Domain A, answered by the document store.
    A,
    /// Domain B, answered by the external documentation source.
    B,
}

impl DomainSide {
    /// The opposite side.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for DomainSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

/// A structural signal: a regex over the normalised query plus its bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heuristic {
    /// Name used in logs and matched-term reports.
    pub name: String,
    /// Regex evaluated against the lowercased query.
    pub pattern: String,
    /// Score bonus when the regex matches (at most 0.3).
    pub bonus: f32,
}

impl Heuristic {
    /// Creates a heuristic.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, bonus: f32) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            bonus,
        }
    }
}

/// Keyword and heuristic tables for one domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainVocabulary {
    /// Domain name (e.g. `tca`).
    pub name: String,
    /// Exact-match keywords and phrases.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Structural heuristics.
    #[serde(default)]
    pub heuristics: Vec<Heuristic>,
    /// Document categories that belong to this domain.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Terms whose presence shows an answer speaks this domain.
    #[serde(default)]
    pub signature_terms: Vec<String>,
}

impl DomainVocabulary {
    /// Creates an empty vocabulary for a named domain.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds keywords.
    #[must_use]
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Adds a heuristic.
    #[must_use]
    pub fn heuristic(mut self, name: impl Into<String>, pattern: impl Into<String>, bonus: f32) -> Self {
        self.heuristics.push(Heuristic::new(name, pattern, bonus));
        self
    }

    /// Adds domain categories.
    #[must_use]
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(categories.into_iter().map(Into::into));
        self
    }

    /// Adds signature terms.
    #[must_use]
    pub fn signature_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signature_terms.extend(terms.into_iter().map(Into::into));
        self
    }
}

/// Words that decide a verdict when neither domain scores above `t_dual`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryHints {
    /// Words implying app development (domain B).
    pub domain_b: Vec<String>,
    /// Words implying architecture or patterns (domain A).
    pub domain_a: Vec<String>,
    /// Words implying debugging across both domains.
    pub hybrid: Vec<String>,
}

impl Default for SecondaryHints {
    fn default() -> Self {
        Self {
            domain_b: strings(&["development", "develop", "app", "apps"]),
            domain_a: strings(&["architecture", "pattern", "patterns", "design"]),
            hybrid: strings(&["bug", "error", "errors", "fix", "crash"]),
        }
    }
}

/// Vocabulary for the structural gap checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapVocabulary {
    /// Query words that ask about state.
    pub state_triggers: Vec<String>,
    /// State-management vocabulary an answer must show.
    pub state_terms: Vec<String>,
    /// Query words that ask about testing.
    pub test_triggers: Vec<String>,
    /// Testing vocabulary an answer must show.
    pub test_terms: Vec<String>,
    /// Query words implying cross-domain integration.
    pub integration_triggers: Vec<String>,
    /// Query words asking about performance.
    pub performance_triggers: Vec<String>,
    /// Performance vocabulary an answer must show.
    pub performance_terms: Vec<String>,
    /// Query words asking for an example or implementation.
    pub example_triggers: Vec<String>,
}

impl Default for GapVocabulary {
    fn default() -> Self {
        Self {
            state_triggers: strings(&["state"]),
            state_terms: strings(&[
                "@observablestate",
                "observablestate",
                "@shared",
                "store",
                "reducer",
                "binding",
                "state management",
                "mutation",
            ]),
            test_triggers: strings(&["test", "tests", "testing"]),
            test_terms: strings(&[
                "teststore",
                "test store",
                "xctest",
                "assert",
                "expect",
                "unit test",
                "mock",
            ]),
            integration_triggers: strings(&[
                "integrate",
                "integration",
                "together",
                "combine",
                "sync",
                "synchronize",
                "bridge",
            ]),
            performance_triggers: strings(&["performance", "slow", "optimize", "latency", "fps"]),
            performance_terms: strings(&[
                "performance",
                "instruments",
                "optimize",
                "optimization",
                "profiling",
                "caching",
                "throttle",
                "debounce",
            ]),
            example_triggers: strings(&[
                "example",
                "implement",
                "implementation",
                "sample",
                "code",
                "how to",
                "show me",
            ]),
        }
    }
}

/// Kind of disagreement an antonym pair signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AntonymKind {
    /// Disagreement about structure or ownership.
    Architectural,
    /// Disagreement about a usage detail.
    ImplementationDetail,
}

/// Two words that signal opposing recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntonymPair {
    /// One side.
    pub left: String,
    /// The opposing side.
    pub right: String,
    /// What kind of contradiction a match indicates.
    pub kind: AntonymKind,
}

impl AntonymPair {
    /// Creates an antonym pair.
    #[must_use]
    pub fn new(left: impl Into<String>, right: impl Into<String>, kind: AntonymKind) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            kind,
        }
    }
}

fn default_antonyms() -> Vec<AntonymPair> {
    vec![
        AntonymPair::new("single", "multiple", AntonymKind::Architectural),
        AntonymPair::new("only", "both", AntonymKind::ImplementationDetail),
        AntonymPair::new("owner", "shared", AntonymKind::Architectural),
        AntonymPair::new("writer", "readers", AntonymKind::Architectural),
        AntonymPair::new("always", "never", AntonymKind::ImplementationDetail),
    ]
}

fn default_safety_critical() -> Vec<String> {
    strings(&["shared-state"])
}

/// Serialisable vocabulary description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Domain A tables (document store).
    pub domain_a: DomainVocabulary,
    /// Domain B tables (external source).
    pub domain_b: DomainVocabulary,
    /// Low-signal fallback words.
    #[serde(default)]
    pub secondary_hints: SecondaryHints,
    /// Structural gap-check vocabulary.
    #[serde(default)]
    pub gaps: GapVocabulary,
    /// Antonym pairs for contradiction detection.
    #[serde(default = "default_antonyms")]
    pub antonyms: Vec<AntonymPair>,
    /// Pattern domains where any contradiction is critical.
    #[serde(default = "default_safety_critical")]
    pub safety_critical_domains: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        let domain_a = DomainVocabulary::new("tca")
            .keywords([
                "reducer",
                "store",
                "effect",
                "action",
                "@ObservableState",
                "@Shared",
                "@Dependency",
                "TestStore",
                "scope",
                "tca",
                "composable architecture",
                "state management",
                "dependency injection",
            ])
            .heuristic(
                "property-wrapper-sigil",
                r"@(observablestate|shared|dependency|presents|reducer|bindable)\b",
                0.3,
            )
            .heuristic("testing", r"\btest(s|ing|store)?\b", 0.2)
            .heuristic("controller", r"\bcontrollers?\b", 0.1)
            .categories(["tca", "architecture", "swiftui"])
            .signature_terms(["reducer", "store", "state", "action"]);

        let domain_b = DomainVocabulary::new("visionos")
            .keywords([
                "visionos",
                "shareplay",
                "groupactivity",
                "group activity",
                "groupsession",
                "group session",
                "groupsessionmessenger",
                "realitykit",
                "immersive space",
                "arkit",
                "spatial persona",
                "window group",
                "facetime",
            ])
            .heuristic("spatial", r"\b(immersive|spatial|volumetric)\b", 0.3)
            .heuristic("collaboration", r"\b(participants?|collaborat\w*|co-?present)\b", 0.3)
            .heuristic("vision-hardware", r"\b(vision pro|headset|hand tracking)\b", 0.2)
            .categories(["visionos", "shareplay", "platform-specific"])
            .signature_terms(["groupsession", "group session", "shareplay", "realitykit", "immersive"]);

        Self {
            domain_a,
            domain_b,
            secondary_hints: SecondaryHints::default(),
            gaps: GapVocabulary::default(),
            antonyms: default_antonyms(),
            safety_critical_domains: default_safety_critical(),
        }
    }
}

impl VocabularyConfig {
    /// Parses a vocabulary from TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed TOML.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads a vocabulary TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Replaces the antonym table.
    #[must_use]
    pub fn with_antonyms(mut self, antonyms: Vec<AntonymPair>) -> Self {
        self.antonyms = antonyms;
        self
    }

    /// Marks a pattern domain as safety-critical.
    #[must_use]
    pub fn with_safety_critical_domain(mut self, domain: impl Into<String>) -> Self {
        self.safety_critical_domains.push(domain.into());
        self
    }
}

/// A heuristic with its compiled regex.
#[derive(Debug, Clone)]
pub struct CompiledHeuristic {
    /// Heuristic name.
    pub name: String,
    /// Compiled pattern.
    pub regex: Regex,
    /// Bonus when matched.
    pub bonus: f32,
}

/// Validated vocabulary shared by the scorers.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    config: VocabularyConfig,
    heuristics_a: Vec<CompiledHeuristic>,
    heuristics_b: Vec<CompiledHeuristic>,
}

impl Vocabulary {
    /// Validates a config and compiles its heuristics.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid regex and a config error for
    /// empty or duplicate domain names, out-of-range bonuses or empty
    /// antonym sides.
    pub fn new(config: VocabularyConfig) -> RouteResult<Self> {
        for (field, domain) in [("domain_a", &config.domain_a), ("domain_b", &config.domain_b)] {
            if domain.name.trim().is_empty() {
                return Err(ConfigError::invalid(format!("{field}.name"), "cannot be empty").into());
            }
            if domain.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ConfigError::invalid(format!("{field}.keywords"), "contains an empty keyword").into());
            }
        }
        if config.domain_a.name.eq_ignore_ascii_case(&config.domain_b.name) {
            return Err(ConfigError::invalid("domain_b.name", "must differ from domain_a.name").into());
        }
        if config
            .antonyms
            .iter()
            .any(|p| p.left.trim().is_empty() || p.right.trim().is_empty())
        {
            return Err(ConfigError::invalid("antonyms", "pair sides cannot be empty").into());
        }

        let heuristics_a = compile_heuristics(&config.domain_a.heuristics)?;
        let heuristics_b = compile_heuristics(&config.domain_b.heuristics)?;

        Ok(Self {
            config,
            heuristics_a,
            heuristics_b,
        })
    }

    /// The underlying config.
    #[must_use]
    pub const fn config(&self) -> &VocabularyConfig {
        &self.config
    }

    /// Tables for one side.
    #[must_use]
    pub const fn domain(&self, side: DomainSide) -> &DomainVocabulary {
        match side {
            DomainSide::A => &self.config.domain_a,
            DomainSide::B => &self.config.domain_b,
        }
    }

    /// Compiled heuristics for one side.
    #[must_use]
    pub fn heuristics(&self, side: DomainSide) -> &[CompiledHeuristic] {
        match side {
            DomainSide::A => &self.heuristics_a,
            DomainSide::B => &self.heuristics_b,
        }
    }

    /// Secondary fallback hints.
    #[must_use]
    pub const fn secondary_hints(&self) -> &SecondaryHints {
        &self.config.secondary_hints
    }

    /// Gap-check vocabulary.
    #[must_use]
    pub const fn gaps(&self) -> &GapVocabulary {
        &self.config.gaps
    }

    /// Antonym pairs.
    #[must_use]
    pub fn antonyms(&self) -> &[AntonymPair] {
        &self.config.antonyms
    }

    /// Returns true if the pattern domain is flagged safety-critical.
    #[must_use]
    pub fn is_safety_critical(&self, domain: &str) -> bool {
        self.config
            .safety_critical_domains
            .iter()
            .any(|d| d.eq_ignore_ascii_case(domain.trim()))
    }

    /// Returns the side whose categories include `category`, if any.
    #[must_use]
    pub fn side_for_category(&self, category: &str) -> Option<DomainSide> {
        [DomainSide::A, DomainSide::B].into_iter().find(|side| {
            self.domain(*side)
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category.trim()))
        })
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        let config = VocabularyConfig::default();
        let heuristics_a = compile_heuristics(&config.domain_a.heuristics).unwrap_or_default();
        let heuristics_b = compile_heuristics(&config.domain_b.heuristics).unwrap_or_default();
        Self {
            config,
            heuristics_a,
            heuristics_b,
        }
    }
}

fn compile_heuristics(heuristics: &[Heuristic]) -> RouteResult<Vec<CompiledHeuristic>> {
    heuristics
        .iter()
        .map(|h| {
            if !(h.bonus > 0.0 && h.bonus <= MAX_HEURISTIC_BONUS) {
                return Err(RouteError::from(ConfigError::invalid(
                    format!("heuristics.{}.bonus", h.name),
                    format!("must be in (0, {MAX_HEURISTIC_BONUS}], got {}", h.bonus),
                )));
            }
            let regex = Regex::new(&h.pattern).map_err(|e| ValidationError::InvalidHeuristic {
                pattern: h.pattern.clone(),
                reason: e.to_string(),
            })?;
            Ok(CompiledHeuristic {
                name: h.name.clone(),
                regex,
                bonus: h.bonus,
            })
        })
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
