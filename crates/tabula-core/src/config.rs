//! Engine configuration.
//!
//! Loaded once per session from TOML (or built in code) and never mutated by
//! query execution.
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// QueryConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Accept `char` literals against integer properties.
    pub char_int_compat: bool,

    /// How `last` / `last_or_default` locate the final match.
    pub last_strategy: LastStrategy,

    /// Record metrics events for translation and execution.
    pub metrics: bool,
}

impl QueryConfig {
    /// Parse a TOML document. Missing keys take their defaults; unknown keys
    /// are rejected.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    #[must_use]
    pub const fn with_last_strategy(mut self, strategy: LastStrategy) -> Self {
        self.last_strategy = strategy;
        self
    }

    #[must_use]
    pub const fn with_char_int_compat(mut self, enabled: bool) -> Self {
        self.char_int_compat = enabled;
        self
    }

    #[must_use]
    pub const fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics = enabled;
        self
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            char_int_compat: true,
            last_strategy: LastStrategy::default(),
            metrics: true,
        }
    }
}

///
/// LastStrategy
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LastStrategy {
    /// Always read `count - 1` from a materialized results view.
    #[default]
    Materialize,

    /// Without a sort, walk the query with `find_direct` and keep the final
    /// match; no results view is created. Sorted queries still materialize.
    DirectScan,
}

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid query config: {0}")]
    Parse(#[from] toml::de::Error),
}

///
/// TESTS
///
