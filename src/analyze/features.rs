//! Rule-driven feature extraction (patterns loaded from `config/features.toml`).
//!
//! TOML shape:
//! ```toml
//! [labels.docker]
//! contains = ["docker", "dockerfile"]        # case-insensitive substrings
//! regex    = ['\bcontainer(s|ized)?\b']      # case-insensitive regexes
//!
//! [sota]
//! contains = ["state of the art"]
//! regex    = ['\bsota\b']
//! ```
//!
//! Every label is evaluated independently; a label is set when any of its
//! patterns matches the text or tags. The table is loaded once at startup.

use anyhow::{anyhow, Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FEATURES_CONFIG_PATH: &str = "config/features.toml";
pub const ENV_FEATURES_CONFIG_PATH: &str = "FEATURES_CONFIG_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningParadigm {
    Supervised,
    Unsupervised,
    Reinforcement,
    DeepLearning,
    Statistical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Docker,
    Pip,
    Conda,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCharacteristic {
    Multivariate,
    Exogenous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hardware {
    Gpu,
}

/// Flat label namespace used as keys in the pattern table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLabel {
    Supervised,
    Unsupervised,
    Reinforcement,
    DeepLearning,
    Statistical,
    Docker,
    Pip,
    Conda,
    Multivariate,
    Exogenous,
    Gpu,
}

impl FeatureLabel {
    pub const ALL: [FeatureLabel; 11] = [
        FeatureLabel::Supervised,
        FeatureLabel::Unsupervised,
        FeatureLabel::Reinforcement,
        FeatureLabel::DeepLearning,
        FeatureLabel::Statistical,
        FeatureLabel::Docker,
        FeatureLabel::Pip,
        FeatureLabel::Conda,
        FeatureLabel::Multivariate,
        FeatureLabel::Exogenous,
        FeatureLabel::Gpu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureLabel::Supervised => "supervised",
            FeatureLabel::Unsupervised => "unsupervised",
            FeatureLabel::Reinforcement => "reinforcement",
            FeatureLabel::DeepLearning => "deep_learning",
            FeatureLabel::Statistical => "statistical",
            FeatureLabel::Docker => "docker",
            FeatureLabel::Pip => "pip",
            FeatureLabel::Conda => "conda",
            FeatureLabel::Multivariate => "multivariate",
            FeatureLabel::Exogenous => "exogenous",
            FeatureLabel::Gpu => "gpu",
        }
    }
}

impl std::str::FromStr for FeatureLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        FeatureLabel::ALL
            .into_iter()
            .find(|l| l.as_str() == key)
            .ok_or_else(|| anyhow!("unknown feature label `{s}`"))
    }
}

/// Multi-label attributes derived from a record's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub learning_paradigm: BTreeSet<LearningParadigm>,
    #[serde(default)]
    pub environment: BTreeSet<Environment>,
    #[serde(default)]
    pub data_characteristics: BTreeSet<DataCharacteristic>,
    #[serde(default)]
    pub hardware: BTreeSet<Hardware>,
    #[serde(default)]
    pub sota: bool,
}

impl FeatureSet {
    pub fn is_empty(&self) -> bool {
        self.learning_paradigm.is_empty()
            && self.environment.is_empty()
            && self.data_characteristics.is_empty()
            && self.hardware.is_empty()
            && !self.sota
    }

    pub fn insert(&mut self, label: FeatureLabel) {
        use FeatureLabel as L;
        match label {
            L::Supervised => self.learning_paradigm.insert(LearningParadigm::Supervised),
            L::Unsupervised => self.learning_paradigm.insert(LearningParadigm::Unsupervised),
            L::Reinforcement => self.learning_paradigm.insert(LearningParadigm::Reinforcement),
            L::DeepLearning => self.learning_paradigm.insert(LearningParadigm::DeepLearning),
            L::Statistical => self.learning_paradigm.insert(LearningParadigm::Statistical),
            L::Docker => self.environment.insert(Environment::Docker),
            L::Pip => self.environment.insert(Environment::Pip),
            L::Conda => self.environment.insert(Environment::Conda),
            L::Multivariate => self.data_characteristics.insert(DataCharacteristic::Multivariate),
            L::Exogenous => self.data_characteristics.insert(DataCharacteristic::Exogenous),
            L::Gpu => self.hardware.insert(Hardware::Gpu),
        };
    }

    pub fn has(&self, label: FeatureLabel) -> bool {
        use FeatureLabel as L;
        match label {
            L::Supervised => self.learning_paradigm.contains(&LearningParadigm::Supervised),
            L::Unsupervised => self.learning_paradigm.contains(&LearningParadigm::Unsupervised),
            L::Reinforcement => self.learning_paradigm.contains(&LearningParadigm::Reinforcement),
            L::DeepLearning => self.learning_paradigm.contains(&LearningParadigm::DeepLearning),
            L::Statistical => self.learning_paradigm.contains(&LearningParadigm::Statistical),
            L::Docker => self.environment.contains(&Environment::Docker),
            L::Pip => self.environment.contains(&Environment::Pip),
            L::Conda => self.environment.contains(&Environment::Conda),
            L::Multivariate => self
                .data_characteristics
                .contains(&DataCharacteristic::Multivariate),
            L::Exogenous => self.data_characteristics.contains(&DataCharacteristic::Exogenous),
            L::Gpu => self.hardware.contains(&Hardware::Gpu),
        }
    }
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub regex: Vec<String>,
}

impl PatternSpec {
    fn new(contains: &[&str], regex: &[&str]) -> Self {
        Self {
            contains: contains.iter().map(|s| s.to_string()).collect(),
            regex: regex.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRules {
    pub labels: BTreeMap<FeatureLabel, PatternSpec>,
    pub sota: PatternSpec,
}

/// On-disk shape; label keys are validated while converting.
#[derive(Debug, Deserialize)]
struct FeatureRulesFile {
    #[serde(default)]
    labels: BTreeMap<String, PatternSpec>,
    #[serde(default)]
    sota: PatternSpec,
}

impl FeatureRules {
    /// Built-in table used when no config file is present.
    pub fn default_seed() -> Self {
        use FeatureLabel as L;
        let labels = BTreeMap::from([
            (
                L::Supervised,
                PatternSpec::new(&["forecasting", "classification", "regression"], &[r"(^|[^\w-])supervised\b"]),
            ),
            (
                L::Unsupervised,
                PatternSpec::new(
                    &[
                        "unsupervised",
                        "self-supervised",
                        "anomaly detection",
                        "clustering",
                        "outlier",
                        "contrastive",
                    ],
                    &[],
                ),
            ),
            (
                L::Reinforcement,
                PatternSpec::new(&["reinforcement learning"], &[r"\brl\b", r"\bgym\b", r"\breward\b"]),
            ),
            (
                L::DeepLearning,
                PatternSpec::new(
                    &[
                        "deep learning",
                        "neural network",
                        "lstm",
                        "transformer",
                        "pytorch",
                        "tensorflow",
                        "keras",
                        "diffusion",
                        "attention",
                    ],
                    &[r"\brnn\b", r"\bcnn\b"],
                ),
            ),
            (
                L::Statistical,
                PatternSpec::new(
                    &[
                        "arima",
                        "prophet",
                        "statistical",
                        "bayesian",
                        "stochastic",
                        "exponential smoothing",
                        "xgboost",
                        "lightgbm",
                        "scikit-learn",
                    ],
                    &[r"\bets\b"],
                ),
            ),
            (
                L::Docker,
                PatternSpec::new(&["docker", "dockerfile", "docker-compose"], &[r"\bcontainer(s|ized)?\b"]),
            ),
            (
                L::Pip,
                PatternSpec::new(&["pip install", "requirements.txt", "setup.py", "pyproject.toml"], &[]),
            ),
            (
                L::Conda,
                PatternSpec::new(&["conda install", "environment.yml"], &[r"\bconda\b"]),
            ),
            (
                L::Multivariate,
                PatternSpec::new(&["multivariate", "multi-variate", "multiple series"], &[r"\bmts\b"]),
            ),
            (
                L::Exogenous,
                PatternSpec::new(
                    &["exogenous", "covariates", "external variables", "control variables"],
                    &[],
                ),
            ),
            (L::Gpu, PatternSpec::new(&["cuda", "accelerator"], &[r"\bgpus?\b"])),
        ]);
        let sota = PatternSpec::new(
            &[
                "state-of-the-art",
                "state of the art",
                "outperform",
                "benchmark leader",
                "beats",
            ],
            &[r"\bsota\b"],
        );
        Self { labels, sota }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: FeatureRulesFile = toml::from_str(s).context("parsing feature rules toml")?;
        let labels = file
            .labels
            .into_iter()
            .map(|(key, spec)| Ok((key.parse::<FeatureLabel>()?, spec)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            labels,
            sota: file.sota,
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feature rules from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the table:
    /// 1) $FEATURES_CONFIG_PATH (must exist)
    /// 2) config/features.toml
    /// 3) built-in seed
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_FEATURES_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("FEATURES_CONFIG_PATH points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default = PathBuf::from(DEFAULT_FEATURES_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        Ok(Self::default_seed())
    }
}

/* ----------------------------
Compiled extractor
---------------------------- */

#[derive(Debug, Clone)]
struct CompiledPatterns {
    contains: Vec<String>,
    regex: Vec<Regex>,
}

impl CompiledPatterns {
    fn compile(owner: &str, spec: &PatternSpec) -> Result<Self> {
        let contains = spec
            .contains
            .iter()
            .map(|p| fold(p))
            .filter(|p| !p.is_empty())
            .collect();
        let regex = spec
            .regex
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| anyhow!("`{owner}` regex error: {e}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { contains, regex })
    }

    fn matches(&self, folded: &str) -> bool {
        self.contains.iter().any(|p| folded.contains(p.as_str()))
            || self.regex.iter().any(|re| re.is_match(folded))
    }
}

/// Pattern table compiled once; shared read-only across records.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    labels: Vec<(FeatureLabel, CompiledPatterns)>,
    sota: CompiledPatterns,
}

impl FeatureExtractor {
    pub fn new(rules: &FeatureRules) -> Result<Self> {
        let labels = rules
            .labels
            .iter()
            .map(|(label, spec)| {
                Ok((*label, CompiledPatterns::compile(label.as_str(), spec)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let sota = CompiledPatterns::compile("sota", &rules.sota)?;
        Ok(Self { labels, sota })
    }

    /// Derive the feature set from `text` and optional `tags`.
    pub fn extract(&self, text: &str, tags: &[String]) -> FeatureSet {
        let mut haystack = String::with_capacity(text.len() + tags.len() * 16);
        haystack.push_str(text);
        for t in tags {
            haystack.push(' ');
            haystack.push_str(t);
        }
        let folded = fold(&haystack);

        let mut out = FeatureSet::default();
        if folded.is_empty() {
            return out;
        }
        for (label, patterns) in &self.labels {
            if patterns.matches(&folded) {
                out.insert(*label);
            }
        }
        out.sota = self.sota.matches(&folded);
        out
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(&FeatureRules::default_seed()).expect("built-in feature rules compile")
    }
}

/// Lowercase and condense whitespace.
fn fold(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> FeatureSet {
        FeatureExtractor::default().extract(text, &[])
    }

    #[test]
    fn labels_are_independent_and_multi() {
        let f = extract(
            "Multivariate LSTM with exogenous covariates. Run via Dockerfile or pip install tsx. Needs CUDA.",
        );
        assert!(f.has(FeatureLabel::Multivariate));
        assert!(f.has(FeatureLabel::Exogenous));
        assert!(f.has(FeatureLabel::DeepLearning));
        assert!(f.has(FeatureLabel::Docker));
        assert!(f.has(FeatureLabel::Pip));
        assert!(f.has(FeatureLabel::Gpu));
        assert!(!f.has(FeatureLabel::Conda));
        assert!(!f.sota);
    }

    #[test]
    fn case_and_whitespace_insensitive() {
        let f = extract("  STATE   OF THE\tART anomaly   DETECTION ");
        assert!(f.sota);
        assert!(f.has(FeatureLabel::Unsupervised));
    }

    #[test]
    fn word_boundaries_keep_short_tokens_honest() {
        // "ets" inside "assets", "rl" inside "world", "gpu" absent
        let f = extract("tracking assets around the world");
        assert!(f.is_empty());
        let f = extract("ETS baseline vs an RL agent on 8 GPUs");
        assert!(f.has(FeatureLabel::Statistical));
        assert!(f.has(FeatureLabel::Reinforcement));
        assert!(f.has(FeatureLabel::Gpu));
    }

    #[test]
    fn unsupervised_does_not_imply_supervised() {
        let f = extract("an unsupervised method");
        assert!(f.has(FeatureLabel::Unsupervised));
        assert!(!f.has(FeatureLabel::Supervised));

        let f = extract("a self-supervised contrastive encoder");
        assert!(f.has(FeatureLabel::Unsupervised));
        assert!(!f.has(FeatureLabel::Supervised));

        assert!(extract("supervised pretraining").has(FeatureLabel::Supervised));
        assert!(extract("fully supervised baseline").has(FeatureLabel::Supervised));
    }

    #[test]
    fn tags_participate_in_matching() {
        let ex = FeatureExtractor::default();
        let f = ex.extract("", &["time-series-forecasting".to_string(), "sota".to_string()]);
        assert!(f.has(FeatureLabel::Supervised));
        assert!(f.sota);
    }

    #[test]
    fn empty_text_yields_empty_set() {
        let ex = FeatureExtractor::default();
        assert_eq!(ex.extract("", &[]), FeatureSet::default());
        assert_eq!(ex.extract("   \n", &[]), FeatureSet::default());
    }

    #[test]
    fn extraction_is_idempotent() {
        let ex = FeatureExtractor::default();
        let text = "Transformer that outperforms ARIMA on multivariate data";
        assert_eq!(ex.extract(text, &[]), ex.extract(text, &[]));
    }

    #[test]
    fn toml_table_parses_and_compiles() {
        let toml = r#"
            [labels.docker]
            contains = ["docker"]

            [labels.gpu]
            regex = ['\btpu\b']

            [sota]
            contains = ["new record"]
        "#;
        let rules = FeatureRules::from_toml_str(toml).unwrap();
        let ex = FeatureExtractor::new(&rules).unwrap();
        let f = ex.extract("Docker image, trains on a TPU, sets a new record", &[]);
        assert!(f.has(FeatureLabel::Docker));
        assert!(f.has(FeatureLabel::Gpu));
        assert!(f.sota);
        // labels absent from the table never fire
        assert!(!ex.extract("lstm", &[]).has(FeatureLabel::DeepLearning));
    }

    #[test]
    fn bad_regex_is_reported() {
        let rules = FeatureRules::from_toml_str("[labels.pip]\nregex = ['(unclosed']").unwrap();
        let err = FeatureExtractor::new(&rules).unwrap_err();
        assert!(err.to_string().contains("`pip`"));
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = FeatureRules::from_toml_str("[labels.quantum]\ncontains = ['x']").unwrap_err();
        assert!(err.to_string().contains("quantum"));
    }

    #[test]
    fn shipped_config_matches_builtin_seed() {
        let shipped = include_str!("../../config/features.toml");
        let rules = FeatureRules::from_toml_str(shipped).unwrap();
        assert_eq!(rules, FeatureRules::default_seed());
    }
}
