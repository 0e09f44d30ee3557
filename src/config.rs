//! Router configuration.
//!
//! Every tunable threshold, weight and bound lives here so the scoring rules
//! can be adjusted without touching routing logic. Configs load from TOML and
//! are validated before use.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Classifier thresholds and weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Score a domain needs to be primary on its own.
    pub t_single: f32,
    /// Score at which a domain counts as present.
    pub t_dual: f32,
    /// Weight of the keyword score in the blend.
    pub keyword_weight: f32,
    /// Weight of the heuristic score in the blend.
    pub heuristic_weight: f32,
    /// Weight of an exact phrase match.
    pub exact_match_weight: f32,
    /// Weight of a partial token overlap.
    pub partial_match_weight: f32,
    /// Keyword weight at which the keyword score saturates at 1.0.
    pub max_possible_weight: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            t_single: 0.5,
            t_dual: 0.3,
            keyword_weight: 0.6,
            heuristic_weight: 0.4,
            exact_match_weight: 2.0,
            partial_match_weight: 1.0,
            max_possible_weight: 3.0,
        }
    }
}

/// Response cache bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entry age in seconds.
    pub ttl_secs: u64,
    /// Entries below this confidence are never served.
    pub confidence_floor: f32,
    /// Maximum number of entries before the oldest is evicted.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            confidence_floor: 0.3,
            max_entries: 256,
        }
    }
}

impl CacheConfig {
    /// TTL as a chrono duration (saturates at `u32::MAX` seconds).
    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        let secs = u32::try_from(self.ttl_secs).unwrap_or(u32::MAX);
        chrono::Duration::seconds(i64::from(secs))
    }
}

/// Gap detector bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    /// Combined answer length below which an example request is a gap.
    pub min_response_chars: usize,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            min_response_chars: 500,
        }
    }
}

/// Progressive-disclosure bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Characters kept in a content preview.
    pub preview_chars: usize,
    /// Maximum key points per document.
    pub max_key_points: usize,
    /// Characters kept per key point.
    pub key_point_chars: usize,
    /// Maximum code examples per document.
    pub max_code_examples: usize,
    /// Code blocks longer than this are cut to their first lines.
    pub code_block_chars: usize,
    /// Lines kept from a long code block.
    pub code_block_lines: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            preview_chars: 150,
            max_key_points: 5,
            key_point_chars: 80,
            max_code_examples: 3,
            code_block_chars: 200,
            code_block_lines: 3,
        }
    }
}

/// Top-level router configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Classifier settings.
    pub classifier: ClassifierConfig,
    /// Cache settings.
    pub cache: CacheConfig,
    /// Gap detector settings.
    pub gaps: GapConfig,
    /// Synthesis settings.
    pub synthesis: SynthesisConfig,
    /// Whole-call timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum total confidence gained from gap-fill splices.
    pub gap_fill_bonus_cap: f32,
    /// Responses below this confidence carry a low-confidence warning.
    pub low_confidence_warning: f32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            cache: CacheConfig::default(),
            gaps: GapConfig::default(),
            synthesis: SynthesisConfig::default(),
            timeout_ms: 10_000,
            gap_fill_bonus_cap: 0.2,
            low_confidence_warning: 0.5,
        }
    }
}

impl RouterConfig {
    /// Parses and validates a TOML config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read`, `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Whole-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Checks threshold ordering and ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.classifier;
        for (field, value) in [
            ("classifier.t_single", c.t_single),
            ("classifier.t_dual", c.t_dual),
            ("classifier.keyword_weight", c.keyword_weight),
            ("classifier.heuristic_weight", c.heuristic_weight),
            ("cache.confidence_floor", self.cache.confidence_floor),
            ("low_confidence_warning", self.low_confidence_warning),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, format!("{value} is outside [0, 1]")));
            }
        }
        if c.t_dual >= c.t_single {
            return Err(ConfigError::invalid("classifier.t_dual", "must be below t_single"));
        }
        if (c.keyword_weight + c.heuristic_weight - 1.0).abs() > 1e-6 {
            return Err(ConfigError::invalid(
                "classifier.keyword_weight",
                "keyword_weight and heuristic_weight must sum to 1.0",
            ));
        }
        if c.max_possible_weight <= 0.0 || c.exact_match_weight <= 0.0 || c.partial_match_weight < 0.0 {
            return Err(ConfigError::invalid("classifier.max_possible_weight", "weights must be positive"));
        }
        if !(0.0..=0.2).contains(&self.gap_fill_bonus_cap) {
            return Err(ConfigError::invalid("gap_fill_bonus_cap", "must be within [0, 0.2]"));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::invalid("cache.max_entries", "must be at least 1"));
        }
        if self.synthesis.key_point_chars < 4 || self.synthesis.preview_chars == 0 {
            return Err(ConfigError::invalid("synthesis", "preview and key point lengths are too small"));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid("timeout_ms", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RouterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.ttl(), chrono::Duration::hours(24));
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RouterConfig::from_toml_str(
            r"
            timeout_ms = 2500

            [cache]
            max_entries = 8
            ",
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.cache.max_entries, 8);
        assert!((config.cache.confidence_floor - 0.3).abs() < f32::EPSILON);
        assert!((config.classifier.t_single - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_threshold_order_enforced() {
        let err = RouterConfig::from_toml_str(
            r"
            [classifier]
            t_single = 0.3
            t_dual = 0.4
            ",
        )
        .unwrap_err();
        assert!(err.to_string().contains("t_dual"));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = RouterConfig::default();
        config.classifier.heuristic_weight = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gap_bonus_cap_bounded() {
        let mut config = RouterConfig::default();
        config.gap_fill_bonus_cap = 0.35;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gap_fill_bonus_cap"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "low_confidence_warning = 0.6").unwrap();
        writeln!(file, "[gaps]").unwrap();
        writeln!(file, "min_response_chars = 800").unwrap();
        drop(file);

        let config = RouterConfig::load(&path).unwrap();
        assert!((config.low_confidence_warning - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.gaps.min_response_chars, 800);
    }

    #[test]
    fn test_malformed_toml() {
        let err = RouterConfig::from_toml_str("timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
