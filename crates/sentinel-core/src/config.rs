//! Configuration types for the Sentinel.
//!
//! Every section is `#[serde(default)]`, so a TOML file only needs the
//! values it overrides:
//!
//! ```toml
//! [bias]
//! temporal_window = 20
//!
//! [diversity]
//! diversity_threshold = 0.35
//!
//! [correction]
//! max_correction = 0.1
//! seed = 7
//!
//! [batch]
//! default_mode = "sequential"
//! time_limit_ms = 30000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use sentinel_council::BatchConfig;
use sentinel_monitor::{BiasConfig, DiversityConfig};

use crate::{error::SentinelError, Result};

/// Configuration for a [`Sentinel`](crate::Sentinel) and its session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Bias detector configuration.
    pub bias: BiasConfig,

    /// Diversity analyzer configuration. Its `diversity_threshold` also
    /// gates corrections and interventions.
    pub diversity: DiversityConfig,

    /// Score correction policy.
    pub correction: CorrectionConfig,

    /// Batch aggregator configuration.
    pub batch: BatchConfig,
}

impl SentinelConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.bias.validate()?;
        self.diversity.validate()?;
        self.correction.validate()?;
        self.batch.validate()?;
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SentinelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Score correction policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Fraction of the bias adjustment applied to raw scores (0.0 to 1.0).
    pub correction_strength: f64,

    /// Minimum sentinel confidence before scores are touched (0.0 to 1.0).
    pub intervention_threshold: f64,

    /// Largest adjustment considered routine; larger ones are significant
    /// interventions and the bias delta is clamped to it.
    pub max_correction: f64,

    /// Capacity of the analysis history.
    pub history_capacity: usize,

    /// Seed for the diversity perturbation. Unset means entropy-seeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl CorrectionConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Correction strength: 0.5
    /// - Intervention threshold: 0.6
    /// - Max correction: 0.2
    /// - History capacity: 100
    #[must_use]
    pub const fn new() -> Self {
        Self {
            correction_strength: 0.5,
            intervention_threshold: 0.6,
            max_correction: 0.2,
            history_capacity: 100,
            seed: None,
        }
    }

    /// Sets the correction strength.
    #[must_use]
    pub const fn with_strength(mut self, strength: f64) -> Self {
        self.correction_strength = strength;
        self
    }

    /// Sets the intervention threshold.
    #[must_use]
    pub const fn with_intervention_threshold(mut self, threshold: f64) -> Self {
        self.intervention_threshold = threshold;
        self
    }

    /// Sets the maximum correction.
    #[must_use]
    pub const fn with_max_correction(mut self, max: f64) -> Self {
        self.max_correction = max;
        self
    }

    /// Sets the analysis history capacity.
    #[must_use]
    pub const fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Sets the perturbation seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks every field for a usable value.
    pub fn validate(&self) -> Result<()> {
        unit_interval("correction_strength", self.correction_strength)?;
        unit_interval("intervention_threshold", self.intervention_threshold)?;
        if !self.max_correction.is_finite() || self.max_correction <= 0.0 {
            return Err(SentinelError::Config(format!(
                "max_correction must be a positive number, got {}",
                self.max_correction
            )));
        }
        if self.history_capacity == 0 {
            return Err(SentinelError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn unit_interval(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SentinelError::Config(format!(
            "{field} must be in [0, 1], got {value}"
        )))
    }
}
