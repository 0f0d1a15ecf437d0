//! Per-level time budgets.
//!
//! A cycle of `total` milliseconds is split over the levels in proportion to
//! the longest path on each level. When one level holds most of the length
//! (`share > dominant_threshold`) it is capped at `dominant_cap * total` and
//! the surplus is handed to the other levels in proportion to their lengths,
//! so short levels do not flash by.
//!
//! In every branch the per-level durations sum to `total`.

use std::collections::BTreeMap;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::config::AnimationConfig;
use crate::entity::EntityDescriptor;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelBudget {
    pub level_min: i32,
    pub level_max: i32,
    pub time_per_level: BTreeMap<i32, f64>,
}

impl Default for LevelBudget {
    fn default() -> Self {
        Self {
            level_min: 0,
            level_max: -1,
            time_per_level: BTreeMap::new(),
        }
    }
}

impl LevelBudget {
    pub fn compute(entities: &[EntityDescriptor], total_ms: f64, cfg: &AnimationConfig) -> Self {
        Self::from_lengths(entities.iter().map(|e| (e.level, e.length)), total_ms, cfg)
    }

    /// Budget from `(level, length)` pairs. Non-finite or negative lengths count as 0.
    pub fn from_lengths<I>(lengths: I, total_ms: f64, cfg: &AnimationConfig) -> Self
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        let mut longest: BTreeMap<i32, f64> = BTreeMap::new();
        for (level, length) in lengths {
            let length = if length.is_finite() && length > 0.0 {
                length
            } else {
                0.0
            };
            let slot = longest.entry(level).or_insert(0.0);
            if length > *slot {
                *slot = length;
            }
        }

        let (Some(&level_min), Some(&level_max)) =
            (longest.keys().next(), longest.keys().next_back())
        else {
            return Self::default();
        };

        let total = if total_ms.is_finite() && total_ms > 0.0 {
            total_ms
        } else {
            0.0
        };
        let levels = longest.len();
        let full: f64 = longest.values().sum();

        let time_per_level = if full <= 0.0 {
            let even = total / levels as f64;
            longest.keys().map(|&l| (l, even)).collect()
        } else {
            // Ties resolve to the lowest level: strict comparison while walking in order.
            let mut dominant = (level_min, 0.0_f64);
            for (&level, &len) in &longest {
                if len > dominant.1 {
                    dominant = (level, len);
                }
            }
            let share = dominant.1 / full;

            if levels > 1 && share > cfg.dominant_threshold {
                let capped = total * cfg.dominant_cap;
                let delta = dominant.1 - cfg.dominant_cap * full;
                let rest = full - dominant.1;
                trace!(
                    "dominant level {} holds {:.3} of the length, capping at {capped}ms",
                    dominant.0,
                    share
                );
                longest
                    .iter()
                    .map(|(&level, &len)| {
                        let ms = if level == dominant.0 {
                            capped
                        } else if rest > 0.0 {
                            total * (len + delta * len / rest) / full
                        } else {
                            (total - capped) / (levels - 1) as f64
                        };
                        (level, ms)
                    })
                    .collect()
            } else {
                longest
                    .iter()
                    .map(|(&level, &len)| (level, total * len / full))
                    .collect()
            }
        };

        Self {
            level_min,
            level_max,
            time_per_level,
        }
    }

    /// Duration for `level`, or 0 when the level has no entities.
    pub fn duration_for(&self, level: i32) -> f64 {
        self.time_per_level.get(&level).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.time_per_level.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.time_per_level.is_empty()
    }
}
