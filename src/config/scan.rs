// src/config/scan.rs
use chrono::{Duration, NaiveDate};
use std::fmt;
use std::path::PathBuf;

use crate::ingest::normalize::{PopularityMetric, PopularityTable, ARXIV_BASELINE};
use crate::ingest::types::Source;
use crate::ingest::FetchConfig;

pub const ENV_SCAN_LIMIT: &str = "SCAN_LIMIT";
pub const ENV_SCAN_DAYS: &str = "SCAN_DAYS";
pub const ENV_SCAN_CONCURRENCY: &str = "SCAN_CONCURRENCY";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_REPORT_OUTPUT_PATH: &str = "REPORT_OUTPUT_PATH";
pub const ENV_HF_POPULARITY: &str = "HF_POPULARITY";
pub const ENV_ARXIV_BASELINE: &str = "ARXIV_BASELINE";

pub const DEFAULT_LIMIT: usize = 15;
pub const DEFAULT_DAYS: u32 = 365;
/// Upper bound for the lookback window (100 years).
pub const MAX_DAYS: u32 = 36_500;
pub const DEFAULT_CONCURRENCY: usize = 2;
pub const DEFAULT_OUTPUT_PATH: &str = "ts_trend_report.html";

/// Run parameters. Loaded once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Max records per (category, source) query.
    pub limit: usize,
    /// Lookback window in days.
    pub days: u32,
    pub concurrency: usize,
    pub github_token: Option<String>,
    pub output_path: PathBuf,
    /// Hugging Face popularity field: likes (default) or downloads.
    pub hf_popularity: PopularityMetric,
    /// Fixed popularity given to every arXiv paper.
    pub arxiv_baseline: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            days: DEFAULT_DAYS,
            concurrency: DEFAULT_CONCURRENCY,
            github_token: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            hf_popularity: PopularityMetric::Likes,
            arxiv_baseline: ARXIV_BASELINE,
        }
    }
}

// Never print the token itself.
impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("limit", &self.limit)
            .field("days", &self.days)
            .field("concurrency", &self.concurrency)
            .field("github_token", &self.token_fingerprint())
            .field("output_path", &self.output_path)
            .field("hf_popularity", &self.hf_popularity)
            .field("arxiv_baseline", &self.arxiv_baseline)
            .finish()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "unparseable value, using default");
                default
            }
        },
        _ => default,
    }
}

/// Short SHA-256 prefix, enough to tell tokens apart in logs.
pub fn fingerprint(secret: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;
    let digest = Sha256::digest(secret.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

impl ScanConfig {
    /// Read `SCAN_*`, `GITHUB_TOKEN`, `REPORT_OUTPUT_PATH`, `HF_POPULARITY`
    /// and `ARXIV_BASELINE`. Zero values
    /// fall back to defaults like unparseable ones.
    pub fn from_env() -> Self {
        let limit = parse_env(ENV_SCAN_LIMIT, DEFAULT_LIMIT);
        let days = parse_env(ENV_SCAN_DAYS, DEFAULT_DAYS);
        let concurrency = parse_env(ENV_SCAN_CONCURRENCY, DEFAULT_CONCURRENCY);
        let github_token = std::env::var(ENV_GITHUB_TOKEN)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let output_path = std::env::var(ENV_REPORT_OUTPUT_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));
        let hf_popularity = match std::env::var(ENV_HF_POPULARITY) {
            Ok(v) if v.trim().eq_ignore_ascii_case("downloads") => PopularityMetric::Downloads,
            Ok(v) if !v.trim().is_empty() && !v.trim().eq_ignore_ascii_case("likes") => {
                tracing::warn!(key = ENV_HF_POPULARITY, value = %v, "expected likes|downloads, using likes");
                PopularityMetric::Likes
            }
            _ => PopularityMetric::Likes,
        };
        let arxiv_baseline = parse_env(ENV_ARXIV_BASELINE, ARXIV_BASELINE);

        Self {
            limit: if limit == 0 { DEFAULT_LIMIT } else { limit },
            days: match days {
                0 => DEFAULT_DAYS,
                d if d > MAX_DAYS => {
                    tracing::warn!(key = ENV_SCAN_DAYS, value = d, max = MAX_DAYS, "lookback too long, clamped");
                    MAX_DAYS
                }
                d => d,
            },
            concurrency: concurrency.max(1),
            github_token,
            output_path,
            hf_popularity,
            arxiv_baseline,
        }
    }

    pub fn popularity_table(&self) -> PopularityTable {
        let mut table = PopularityTable::default();
        table.entries.insert(Source::HuggingFace, self.hf_popularity);
        table
            .entries
            .insert(Source::Arxiv, PopularityMetric::Fixed(self.arxiv_baseline));
        table
    }

    pub fn token_fingerprint(&self) -> Option<String> {
        self.github_token.as_deref().map(fingerprint)
    }

    /// Earliest creation date considered, counted back from `today`.
    /// Saturates at the earliest representable date.
    pub fn since(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_signed(Duration::days(i64::from(self.days)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn fetch_config(&self, today: NaiveDate) -> FetchConfig {
        FetchConfig {
            limit: self.limit,
            since: self.since(today),
            concurrency: self.concurrency,
        }
    }
}
