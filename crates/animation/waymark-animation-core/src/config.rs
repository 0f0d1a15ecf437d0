//! Configuration for animation pacing and layers.

use serde::{Deserialize, Serialize};
use waymark_geometry::SamplingConfig;

use crate::error::ConfigError;

/// Pacing knobs for the level cycle and the moving markers.
/// The dominant-path constants are empirical; tune them per map if needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Share of the full length above which the longest level is capped.
    pub dominant_threshold: f64,
    /// Share of the duration the capped level keeps.
    pub dominant_cap: f64,
    /// Pause on the last point before the marker is hidden (ms).
    pub hold_ms: f64,
    /// Paths with more samples than this skip points so a run takes about this many steps.
    pub max_steps: usize,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            dominant_threshold: 0.75,
            dominant_cap: 0.7,
            hold_ms: 500.0,
            max_steps: 100,
        }
    }
}

impl AnimationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dominant_threshold > 0.0 && self.dominant_threshold <= 1.0) {
            return Err(ConfigError::new("dominant_threshold must be in (0, 1]"));
        }
        if !(self.dominant_cap > 0.0 && self.dominant_cap <= 1.0) {
            return Err(ConfigError::new("dominant_cap must be in (0, 1]"));
        }
        if !self.hold_ms.is_finite() || self.hold_ms < 0.0 {
            return Err(ConfigError::new("hold_ms must be finite and >= 0"));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::new("max_steps must be > 0"));
        }
        Ok(())
    }
}

/// Per-layer settings: total cycle duration plus the pacing and sampling knobs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Time one full cycle over all levels should take (ms).
    pub animation_duration_ms: f64,
    pub animation: AnimationConfig,
    pub sampling: SamplingConfig,
}

impl LayerConfig {
    pub fn with_duration(animation_duration_ms: f64) -> Self {
        Self {
            animation_duration_ms,
            ..Self::default()
        }
    }

    /// Parse a (possibly partial) JSON object; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: LayerConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::new(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.animation_duration_ms.is_finite() || self.animation_duration_ms < 0.0 {
            return Err(ConfigError::new(
                "animation_duration_ms must be finite and >= 0",
            ));
        }
        self.animation.validate()?;
        self.sampling
            .validate()
            .map_err(|e| ConfigError::new(e.to_string()))
    }
}
