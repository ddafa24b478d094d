//! Discovery service configuration.

use serde::Deserialize;

use crate::{Error, Result, chunks::DEFAULT_CHUNK_MATCHER};

/// How not-found conditions are reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Misses are logged at error level and returned as errors.
    Strict,
    /// Misses are logged as warnings and degrade to absent values.
    #[default]
    Resilient,
}

/// Construction parameters for [`crate::Discovery`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Reporting policy for misses.
    pub strictness: Strictness,
    /// Running under a tooling/reporting context. Strict-mode misses are
    /// logged but not returned as errors.
    pub tooling: bool,
    /// Record lazy searches in the history. Defaults to on in strict mode.
    pub record_history: Option<bool>,
    /// Default pattern used to recover chunk entry-point ids.
    pub chunk_matcher: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            tooling: false,
            record_history: None,
            chunk_matcher: DEFAULT_CHUNK_MATCHER.to_string(),
        }
    }
}

impl DiscoveryConfig {
    /// Strict configuration.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strictness: Strictness::Strict,
            ..Self::default()
        }
    }

    /// Resilient configuration.
    #[must_use]
    pub fn resilient() -> Self {
        Self::default()
    }

    /// Parse a configuration from RON, e.g. `(strictness: strict, tooling: true)`.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// True when misses escalate to errors.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strictness == Strictness::Strict
    }

    /// Whether lazy searches are recorded.
    #[must_use]
    pub fn records_history(&self) -> bool {
        self.record_history.unwrap_or_else(|| self.is_strict())
    }
}
