//! Trend score: popularity plus momentum, with a SOTA bonus.
//!
//! velocity    = metric_primary / age_days        (age_days >= 1)
//! base_score  = metric_primary * w_base + velocity * w_velocity
//! trend_score = base_score * (sota_multiplier if sota else 1.0)

use super::ScoringWeights;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScoreInputs {
    pub metric_primary: u64,
    pub age_days: u64,
    pub sota: bool,
}

impl ScoreInputs {
    /// Clamps `age_days` to at least 1.
    pub fn new(metric_primary: u64, age_days: u64, sota: bool) -> Self {
        Self {
            metric_primary,
            age_days: age_days.max(1),
            sota,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrendScore {
    pub velocity: f64,
    pub base_score: f64,
    pub trend_score: f64,
}

pub fn velocity(metric_primary: u64, age_days: u64) -> f64 {
    metric_primary as f64 / age_days.max(1) as f64
}

/// Never negative, never non-finite for sanitized weights.
pub fn trend_score(inputs: &ScoreInputs, w: &ScoringWeights) -> TrendScore {
    let velocity = velocity(inputs.metric_primary, inputs.age_days);
    let base_score = finite(inputs.metric_primary as f64 * w.w_base + velocity * w.w_velocity);
    let multiplier = if inputs.sota { w.sota_multiplier } else { 1.0 };
    TrendScore {
        velocity,
        base_score,
        trend_score: finite(base_score * multiplier),
    }
}

fn finite(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, f64::MAX)
    }
}
