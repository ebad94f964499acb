//! Engine configuration
//!
//! Loaded from TOML. Every field has a default so an empty document is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::baseline::DEFAULT_BASELINE_WINDOW;
use crate::error::ComputeError;

/// Gap reported when a subject has no mock attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockGapPolicy {
    /// Leave mock accuracy empty and mark the subject as lacking data
    #[default]
    ReportInsufficient,
    /// Fill in `practice_acc - simulated_gap_offset`, marked as simulated
    Simulate,
}

/// Ledger ordering key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSort {
    Accuracy,
    TimeSpent,
    #[default]
    ReturnOnTime,
}

impl std::str::FromStr for LedgerSort {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "accuracy" => Ok(LedgerSort::Accuracy),
            "time_spent" | "time" => Ok(LedgerSort::TimeSpent),
            "return_on_time" | "roi" => Ok(LedgerSort::ReturnOnTime),
            other => Err(ComputeError::ConfigError(format!(
                "unknown ledger sort: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mock_gap_policy: MockGapPolicy,
    pub simulated_gap_offset: f64,
    pub default_ledger_sort: LedgerSort,
    /// Number of wellness samples kept in the rolling baseline
    pub wellness_baseline_window: usize,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mock_gap_policy: MockGapPolicy::default(),
            simulated_gap_offset: 8.0,
            default_ledger_sort: LedgerSort::default(),
            wellness_baseline_window: DEFAULT_BASELINE_WINDOW,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| ComputeError::ConfigError(e.to_string()))?;
        if config.wellness_baseline_window == 0 {
            return Err(ComputeError::ConfigError(
                "wellness_baseline_window must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ComputeError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ComputeError> {
        toml::to_string(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
