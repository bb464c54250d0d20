//! Level-of-detail selection
//!
//! Maps the current zoom scale and dataset size to one of three rendering
//! tiers. The selector only recommends; when a query result exceeds the
//! selected tier's `max_points` the consumer must subsample (see
//! [`stride_sample`]) rather than render everything.

use crate::Point;

/// Rendering fidelity tier, ordered from least to most detailed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Low,
    Medium,
    High,
}

/// Rendering parameters carried by a tier
#[derive(Debug, Clone)]
pub struct TierParams {
    /// Point diameter in pixels
    pub point_size: f64,
    /// Point opacity in [0, 1]
    pub alpha: f64,
    /// Cap on points handed to the renderer
    pub max_points: usize,
}

/// Thresholds and per-tier parameters
///
/// Tier selection: low when `dataset_size > high_volume_threshold` or
/// `scale < low_zoom_threshold`; else medium when
/// `dataset_size > mid_volume_threshold` or `scale < mid_zoom_threshold`;
/// else high. Low-tier conditions win ties.
#[derive(Debug, Clone)]
pub struct LodConfig {
    pub high_volume_threshold: usize,
    pub mid_volume_threshold: usize,
    pub low_zoom_threshold: f64,
    pub mid_zoom_threshold: f64,
    pub low: TierParams,
    pub medium: TierParams,
    pub high: TierParams,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            high_volume_threshold: 50_000,
            mid_volume_threshold: 10_000,
            low_zoom_threshold: 0.5,
            mid_zoom_threshold: 2.0,
            low: TierParams {
                point_size: 1.0,
                alpha: 0.4,
                max_points: 5_000,
            },
            medium: TierParams {
                point_size: 2.0,
                alpha: 0.7,
                max_points: 20_000,
            },
            high: TierParams {
                point_size: 3.0,
                alpha: 1.0,
                max_points: 100_000,
            },
        }
    }
}

/// Pure tier selector over configured thresholds
#[derive(Debug, Clone, Default)]
pub struct LodSelector {
    config: LodConfig,
}

impl LodSelector {
    pub fn new(config: LodConfig) -> Self {
        Self { config }
    }

    /// Select a tier for the given zoom scale and dataset size
    pub fn select(&self, scale: f64, dataset_size: usize) -> Tier {
        let c = &self.config;
        if dataset_size > c.high_volume_threshold || scale < c.low_zoom_threshold {
            Tier::Low
        } else if dataset_size > c.mid_volume_threshold || scale < c.mid_zoom_threshold {
            Tier::Medium
        } else {
            Tier::High
        }
    }

    /// Rendering parameters for a tier
    pub fn params(&self, tier: Tier) -> &TierParams {
        match tier {
            Tier::Low => &self.config.low,
            Tier::Medium => &self.config.medium,
            Tier::High => &self.config.high,
        }
    }

    #[inline]
    pub fn config(&self) -> &LodConfig {
        &self.config
    }
}

/// Deterministic stride subsampling down to at most `max_points`
///
/// Takes every `ceil(len / max_points)`-th point, so the same input always
/// yields the same reduced set.
pub fn stride_sample<'a>(points: &[&'a Point], max_points: usize) -> Vec<&'a Point> {
    if max_points == 0 {
        return Vec::new();
    }
    if points.len() <= max_points {
        return points.to_vec();
    }
    let stride = points.len().div_ceil(max_points);
    points.iter().step_by(stride).copied().collect()
}
