//! Engine configuration
//!
//! Configuration is plain data with serde defaults. It can be built in code,
//! read from YAML, or taken from `CLAUSAL_*` environment variables.

use crate::planner::JoinOrder;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Settings for the text fact format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactTextConfig {
    /// Wrap facts of one type onto lines no longer than this; `None` puts one
    /// fact per line
    #[serde(default)]
    pub line_width: Option<usize>,
    /// Emit a `% FactBase predicate: name/arity` header before each type
    #[serde(default)]
    pub commented: bool,
}

/// Fact base and query engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Join-order heuristic used by queries that do not choose one
    #[serde(default)]
    pub join_order: JoinOrder,
    #[serde(default)]
    pub fact_text: FactTextConfig,
    /// Whether `FactBase::remove` fails on records that are not present
    #[serde(default = "default_true")]
    pub strict_remove: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { join_order: JoinOrder::default(), fact_text: FactTextConfig::default(), strict_remove: true }
    }
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("failed to parse engine configuration")
    }

    /// Read and parse a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine configuration '{}'", path.display()))?;
        let config = Self::from_yaml_str(&text)?;
        info!(path = %path.display(), "Loaded engine configuration");
        Ok(config)
    }

    /// Defaults overridden by `CLAUSAL_JOIN_ORDER`, `CLAUSAL_FACT_LINE_WIDTH`
    /// and `CLAUSAL_FACT_COMMENTED`. Unparseable values are ignored.
    pub fn from_environment() -> Self {
        let mut config = Self::default();
        if let Ok(order) = std::env::var("CLAUSAL_JOIN_ORDER") {
            match order.parse() {
                Ok(order) => config.join_order = order,
                Err(err) => warn!(value = %order, error = %err, "Ignoring CLAUSAL_JOIN_ORDER"),
            }
        }
        config.fact_text.line_width = std::env::var("CLAUSAL_FACT_LINE_WIDTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(config.fact_text.line_width);
        config.fact_text.commented = std::env::var("CLAUSAL_FACT_COMMENTED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.fact_text.commented);
        config
    }
}
