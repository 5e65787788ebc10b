//! Scoring weights loaded once from `config/weights.json`.
//!
//! JSON shape:
//! {
//!   "w_base": 0.3,
//!   "w_velocity": 0.7,
//!   "sota_multiplier": 1.2
//! }
//!
//! Missing keys take their default. Negative or non-finite values are
//! replaced by the default so the scorer never sees them.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_WEIGHTS_CONFIG_PATH: &str = "config/weights.json";
pub const ENV_WEIGHTS_CONFIG_PATH: &str = "WEIGHTS_CONFIG_PATH";

const DEFAULT_W_BASE: f64 = 0.3;
const DEFAULT_W_VELOCITY: f64 = 0.7;
const DEFAULT_SOTA_MULTIPLIER: f64 = 1.2;

fn default_w_base() -> f64 {
    DEFAULT_W_BASE
}
fn default_w_velocity() -> f64 {
    DEFAULT_W_VELOCITY
}
fn default_sota_multiplier() -> f64 {
    DEFAULT_SOTA_MULTIPLIER
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_w_base")]
    pub w_base: f64,
    #[serde(default = "default_w_velocity")]
    pub w_velocity: f64,
    #[serde(default = "default_sota_multiplier")]
    pub sota_multiplier: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            w_base: DEFAULT_W_BASE,
            w_velocity: DEFAULT_W_VELOCITY,
            sota_multiplier: DEFAULT_SOTA_MULTIPLIER,
        }
    }
}

impl ScoringWeights {
    /// Replace negative or non-finite weights with their defaults.
    pub fn sanitized(self) -> Self {
        fn ok_or(v: f64, fallback: f64) -> f64 {
            if v.is_finite() && v >= 0.0 {
                v
            } else {
                fallback
            }
        }
        Self {
            w_base: ok_or(self.w_base, DEFAULT_W_BASE),
            w_velocity: ok_or(self.w_velocity, DEFAULT_W_VELOCITY),
            sota_multiplier: ok_or(self.sota_multiplier, DEFAULT_SOTA_MULTIPLIER),
        }
    }

    /// Resolve weights:
    /// 1) $WEIGHTS_CONFIG_PATH (must exist)
    /// 2) config/weights.json
    /// 3) defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_WEIGHTS_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("WEIGHTS_CONFIG_PATH points to non-existent path"));
            }
            return load_weights_file(&pb);
        }
        let default = PathBuf::from(DEFAULT_WEIGHTS_CONFIG_PATH);
        if default.exists() {
            return load_weights_file(&default);
        }
        Ok(Self::default())
    }
}

/// Load weights directly. Public for tests/tools.
pub fn load_weights_file(path: &Path) -> Result<ScoringWeights> {
    let bytes =
        fs::read(path).with_context(|| format!("reading weights from {}", path.display()))?;
    let w: ScoringWeights = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing weights json {}", path.display()))?;
    Ok(w.sanitized())
}
