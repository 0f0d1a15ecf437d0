//! Sampling configuration for path generation.

use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// Knobs for curve fitting and sampling density.
/// Defaults reproduce the shapes the map bindings have always drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Catmull-Rom parameterization exponent (0 uniform, 0.5 centripetal, 1 chordal).
    pub alpha: f64,
    /// Samples per unit of arc length for curved paths.
    pub density: f64,
    /// Lower bound on the derived sample count for curved paths.
    pub min_samples: usize,
    /// Upper bound on the derived sample count for curved paths.
    pub max_samples: usize,
    /// Sample count for straight paths when none is requested.
    pub straight_samples: usize,
    /// Divisor applied to the segment length when sizing the two-point bulge.
    pub bulge_divisor: f64,
    /// Floor for the slope factor of the bulge so steep segments still bow.
    pub min_bulge_factor: f64,
    /// Chords per Bezier segment used when measuring arc length.
    pub flatten_steps: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.75,
            density: 2.5,
            min_samples: 15,
            max_samples: 10_000,
            straight_samples: 2,
            bulge_divisor: 7.0,
            min_bulge_factor: 0.05,
            flatten_steps: 64,
        }
    }
}

impl SamplingConfig {
    /// Parse a (possibly partial) JSON object; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, PathError> {
        let cfg: SamplingConfig =
            serde_json::from_str(text).map_err(|e| PathError::InvalidConfig {
                reason: e.to_string(),
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PathError> {
        let invalid = |reason: &str| {
            Err(PathError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return invalid("alpha must be finite and >= 0");
        }
        if !self.density.is_finite() || self.density < 0.0 {
            return invalid("density must be finite and >= 0");
        }
        if !self.bulge_divisor.is_finite() || self.bulge_divisor <= 0.0 {
            return invalid("bulge_divisor must be finite and > 0");
        }
        if !(0.0..=1.0).contains(&self.min_bulge_factor) {
            return invalid("min_bulge_factor must be in [0, 1]");
        }
        if self.min_samples == 0 || self.straight_samples == 0 {
            return invalid("sample counts must be > 0");
        }
        if self.max_samples < self.min_samples {
            return invalid("max_samples must be >= min_samples");
        }
        if self.flatten_steps == 0 {
            return invalid("flatten_steps must be > 0");
        }
        Ok(())
    }
}
