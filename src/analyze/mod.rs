// src/analyze/mod.rs
//! Per-record analysis: feature extraction followed by trend scoring.

pub mod features;
pub mod scoring;
pub mod weights;

use serde::{Deserialize, Serialize};

use crate::ingest::normalize::NormalizedRecord;

// Re-export convenient types.
pub use crate::analyze::features::{FeatureExtractor, FeatureLabel, FeatureRules, FeatureSet};
pub use crate::analyze::scoring::{trend_score, ScoreInputs, TrendScore};
pub use crate::analyze::weights::ScoringWeights;

/// A normalized record with its features and score attached. Final once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: NormalizedRecord,
    pub features: FeatureSet,
    pub velocity: f64,
    pub trend_score: f64,
}

/// Read-only configuration shared by every record in a run.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    pub extractor: FeatureExtractor,
    pub weights: ScoringWeights,
}

impl Analyzer {
    pub fn new(extractor: FeatureExtractor, weights: ScoringWeights) -> Self {
        Self {
            extractor,
            weights: weights.sanitized(),
        }
    }

    /// Load the pattern table and weights once (env path, `config/`, or built-ins).
    pub fn from_config() -> anyhow::Result<Self> {
        let rules = FeatureRules::load_default()?;
        let extractor = FeatureExtractor::new(&rules)?;
        let weights = ScoringWeights::load_default()?;
        Ok(Self::new(extractor, weights))
    }

    pub fn score(&self, record: NormalizedRecord) -> ScoredRecord {
        let features = self.extractor.extract(&record.text, &record.tags);
        let inputs = ScoreInputs::new(record.metric_primary, record.age_days, features.sota);
        let s = trend_score(&inputs, &self.weights);
        ScoredRecord {
            record,
            features,
            velocity: s.velocity,
            trend_score: s.trend_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Source;
    use chrono::{TimeZone, Utc};

    #[test]
    fn score_attaches_features_and_bonus() {
        let rec = NormalizedRecord {
            id: "github:a/b".into(),
            source: Source::Github,
            title: "a/b".into(),
            text: "State-of-the-art multivariate forecasting".into(),
            tags: vec![],
            author: None,
            url: "https://github.com/a/b".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            metric_primary: 100,
            age_days: 10,
            category: "Forecasting".into(),
        };
        let scored = Analyzer::default().score(rec);
        assert!(scored.features.sota);
        assert!(scored.features.has(FeatureLabel::Multivariate));
        assert!((scored.velocity - 10.0).abs() < 1e-12);
        assert!((scored.trend_score - 44.4).abs() < 1e-9);
    }
}
