// src/categories.rs
//! Topical search buckets, each with one query string per source.
//!
//! The built-in table can be replaced by `config/categories.toml`:
//! ```toml
//! [[categories]]
//! name = "Forecasting"
//! github = "time series forecasting"
//! huggingface = "time-series-forecasting"
//! arxiv = 'all:"time series forecasting"'
//! ```

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::Source;

pub const DEFAULT_CATEGORIES_CONFIG_PATH: &str = "config/categories.toml";
pub const ENV_CATEGORIES_CONFIG_PATH: &str = "CATEGORIES_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub github: Option<String>,
    pub huggingface: Option<String>,
    pub arxiv: Option<String>,
}

impl Category {
    /// Query for `source`, or `None` when the category skips that source.
    pub fn query_for(&self, source: Source) -> Option<&str> {
        let q = match source {
            Source::Github => self.github.as_deref(),
            Source::HuggingFace => self.huggingface.as_deref(),
            Source::Arxiv => self.arxiv.as_deref(),
        };
        q.map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct CategoriesFile {
    categories: Vec<Category>,
}

fn cat(name: &str, gh: &str, hf: &str, arxiv: &str) -> Category {
    Category {
        name: name.to_string(),
        github: Some(gh.to_string()),
        huggingface: Some(hf.to_string()),
        arxiv: Some(arxiv.to_string()),
    }
}

/// Built-in ten-bucket table.
pub fn default_categories() -> Vec<Category> {
    vec![
        cat(
            "Forecasting",
            "time series forecasting",
            "time-series-forecasting",
            r#"all:"time series forecasting""#,
        ),
        cat(
            "Probabilistic Forecasting",
            "probabilistic time series forecasting OR quantile regression",
            "probabilistic-forecasting",
            r#"all:"probabilistic time series" OR all:"uncertainty estimation""#,
        ),
        cat(
            "Anomaly Detection",
            "time series anomaly detection",
            "anomaly-detection",
            r#"all:"time series anomaly detection""#,
        ),
        cat(
            "Foundation Models",
            "time series foundation model OR large time series model OR zero-shot forecasting",
            "time-series-foundation-model",
            r#"all:"time series" AND (all:"foundation model" OR all:"large language model")"#,
        ),
        cat(
            "Transformers & Attention",
            "time series transformer OR temporal attention",
            "transformer",
            r#"all:"time series transformer" OR all:"temporal attention""#,
        ),
        cat(
            "GNN / Spatial-Temporal",
            "spatiotemporal time series OR graph neural network time series",
            "graph-machine-learning",
            r#"all:"spatiotemporal" OR all:"graph neural network" AND all:"time series""#,
        ),
        cat(
            "Multivariate & Exogenous",
            "multivariate time series forecasting OR exogenous variables",
            "multivariate",
            r#"all:"multivariate time series" OR all:"covariates""#,
        ),
        cat(
            "Finance & Trading",
            "financial time series OR algorithmic trading reinforcement learning",
            "financial-time-series",
            r#"all:"financial time series" OR all:"stock prediction""#,
        ),
        cat(
            "Conferences",
            "topic:neurips-2024 OR topic:icml-2024 OR topic:time-series-conference",
            "arxiv",
            r#"all:"time series" AND (all:"NeurIPS" OR all:"ICML" OR all:"ICLR")"#,
        ),
        cat(
            "Competition Solutions",
            "topic:kaggle-solution OR topic:time-series-competition",
            "competition",
            r#"all:"time series competition" OR all:"forecasting competition""#,
        ),
    ]
}

pub fn parse_categories(s: &str) -> Result<Vec<Category>> {
    let file: CategoriesFile = toml::from_str(s).context("parsing categories toml")?;
    let mut seen = HashSet::new();
    for c in &file.categories {
        let name = c.name.trim();
        if name.is_empty() {
            bail!("category with empty name");
        }
        if !seen.insert(name.to_string()) {
            bail!("duplicate category `{name}`");
        }
    }
    if file.categories.is_empty() {
        bail!("categories table is empty");
    }
    Ok(file.categories)
}

pub fn load_categories_from(path: &Path) -> Result<Vec<Category>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading categories from {}", path.display()))?;
    parse_categories(&content)
}

/// Resolve categories:
/// 1) $CATEGORIES_CONFIG_PATH (must exist)
/// 2) config/categories.toml
/// 3) built-in table
pub fn load_categories_default() -> Result<Vec<Category>> {
    if let Ok(p) = std::env::var(ENV_CATEGORIES_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("CATEGORIES_CONFIG_PATH points to non-existent path"));
        }
        return load_categories_from(&pb);
    }
    let default = PathBuf::from(DEFAULT_CATEGORIES_CONFIG_PATH);
    if default.exists() {
        return load_categories_from(&default);
    }
    Ok(default_categories())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn builtin_table_has_ten_unique_buckets() {
        let cats = default_categories();
        assert_eq!(cats.len(), 10);
        let names: HashSet<_> = cats.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), 10);
        for c in &cats {
            for s in Source::ALL {
                assert!(c.query_for(s).is_some(), "{} lacks {s}", c.name);
            }
        }
    }

    #[test]
    fn toml_override_allows_skipping_a_source() {
        let toml = r#"
            [[categories]]
            name = "Imputation"
            github = "time series imputation"
            arxiv = "  "
        "#;
        let cats = parse_categories(toml).unwrap();
        assert_eq!(cats[0].query_for(Source::Github), Some("time series imputation"));
        assert_eq!(cats[0].query_for(Source::HuggingFace), None);
        assert_eq!(cats[0].query_for(Source::Arxiv), None);
    }

    #[test]
    fn duplicates_and_empty_tables_are_rejected() {
        let dup = r#"
            [[categories]]
            name = "A"
            [[categories]]
            name = "A"
        "#;
        assert!(parse_categories(dup).is_err());
        assert!(parse_categories("categories = []").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CATEGORIES_CONFIG_PATH);

        // no files in temp CWD -> built-in
        assert_eq!(load_categories_default().unwrap().len(), 10);

        let p = tmp.path().join("cats.toml");
        fs::write(&p, "[[categories]]\nname = \"Only\"\ngithub = \"x\"\n").unwrap();
        env::set_var(ENV_CATEGORIES_CONFIG_PATH, p.display().to_string());
        let cats = load_categories_default().unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].name, "Only");

        env::set_var(ENV_CATEGORIES_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(load_categories_default().is_err());
        env::remove_var(ENV_CATEGORIES_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
