//! Engine configuration.
//!
//! Loaded from JSON; every field has a default so an empty object is a valid
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};

/// Minimum number of intersection buckets for smooth visibility ratios.
pub const MIN_INTERSECTION_BUCKETS: usize = 10;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MotionConfig {
    pub driver: DriverConfig,
    pub modal: ModalDefaults,
}

impl MotionConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.driver.validate()
    }
}

/// Continuous driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriverConfig {
    /// Number of equal steps between 0 and 1 in the intersection thresholds.
    pub intersection_buckets: usize,

    /// Without a scroll sample for this long, velocity starts decaying.
    pub velocity_idle_ms: f64,

    /// Per-frame velocity multiplier once idle.
    pub velocity_decay: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            intersection_buckets: 20,
            velocity_idle_ms: 100.0,
            velocity_decay: 0.85,
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.intersection_buckets < MIN_INTERSECTION_BUCKETS {
            return Err(MotionError::InvalidConfig(format!(
                "intersectionBuckets must be at least {MIN_INTERSECTION_BUCKETS}, got {}",
                self.intersection_buckets
            )));
        }
        if !(self.velocity_decay > 0.0 && self.velocity_decay < 1.0) {
            return Err(MotionError::InvalidConfig(format!(
                "velocityDecay must be in (0, 1), got {}",
                self.velocity_decay
            )));
        }
        if self.velocity_idle_ms < 0.0 {
            return Err(MotionError::InvalidConfig(
                "velocityIdleMs must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Intersection thresholds `0, 1/n, ..., 1`.
    pub fn thresholds(&self) -> Vec<f64> {
        let buckets = self.intersection_buckets.max(1);
        (0..=buckets).map(|i| i as f64 / buckets as f64).collect()
    }
}

/// Timing used for modals whose config does not override it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModalDefaults {
    pub duration_ms: f64,
    pub easing: String,
}

impl Default for ModalDefaults {
    fn default() -> Self {
        Self {
            duration_ms: 600.0,
            easing: "cubic-bezier(0.22, 1, 0.36, 1)".into(),
        }
    }
}
