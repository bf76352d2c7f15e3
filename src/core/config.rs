//! Run configuration
//!
//! A `PlacementConfig` bundles everything a placement run depends on. It can
//! be loaded from a JSON file and then overridden from the command line.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::feasibility::FeasibilityPolicy;
use crate::core::placement::{SpacingPolicy, DEFAULT_MAX_STEP, DEFAULT_MIN_STEP};

/// Configuration for placement runs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub spacing: SpacingPolicy,
    pub feasibility: FeasibilityPolicy,
    /// Maximum DFS depth; unbounded when absent
    pub max_depth: Option<usize>,
    /// Seed for random spacing; taken from the clock when absent
    pub seed: Option<u64>,
}

impl PlacementConfig {
    /// Random spacing defaults: 10-14 m steps on roads of at least 13 m/s
    pub fn random() -> Self {
        Self {
            spacing: SpacingPolicy::uniform(DEFAULT_MIN_STEP, DEFAULT_MAX_STEP),
            feasibility: FeasibilityPolicy::with_speed_check(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file; missing fields keep defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PlacementConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.spacing.validate()?;
        self.feasibility.validate()?;
        if self.max_depth == Some(0) {
            return Err(Error::InvalidInput("max depth must be at least 1".to_string()));
        }
        Ok(())
    }
}
