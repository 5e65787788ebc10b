// src/ingest/normalize.rs
//! Maps each source's raw record shape onto one unified schema.
//!
//! Popularity is resolved through [`PopularityTable`], a source-keyed table
//! (`github -> stars`, `huggingface -> likes`, `arxiv -> fixed 0` by default)
//! instead of per-source branching at the call site.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ingest::types::{ArxivEntry, GithubRepo, HfModel, RawSourceRecord, Source};

const TEXT_CAP_CHARS: usize = 2000;

/// Unified record shape. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Source-namespaced stable id, e.g. `github:owner/repo`.
    pub id: String,
    pub source: Source,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub metric_primary: u64,
    /// Whole days since `created_at`, clamped to at least 1.
    pub age_days: u64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    #[error("{0} record has no stable id")]
    MissingId(Source),
    #[error("{0} record has no url")]
    MissingUrl(Source),
    #[error("{0} record has no timestamp")]
    MissingTimestamp(Source),
    #[error("{origin} record has unparseable timestamp `{raw}`")]
    BadTimestamp { origin: Source, raw: String },
}

/// Which raw field stands for popularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopularityMetric {
    Stars,
    Likes,
    Downloads,
    /// Constant proxy for sources without a popularity signal.
    Fixed(u64),
}

/// Stand-in popularity for arXiv papers, which expose no count of their own.
pub const ARXIV_BASELINE: u64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularityTable {
    pub entries: BTreeMap<Source, PopularityMetric>,
}

impl Default for PopularityTable {
    fn default() -> Self {
        let entries = BTreeMap::from([
            (Source::Github, PopularityMetric::Stars),
            (Source::HuggingFace, PopularityMetric::Likes),
            (Source::Arxiv, PopularityMetric::Fixed(ARXIV_BASELINE)),
        ]);
        Self { entries }
    }
}

impl PopularityTable {
    /// Popularity for a raw record. Unknown sources and fields a source does
    /// not carry resolve to 0.
    pub fn metric_for(&self, raw: &RawSourceRecord) -> u64 {
        let Some(metric) = self.entries.get(&raw.source()) else {
            return 0;
        };
        match (metric, raw) {
            (PopularityMetric::Fixed(v), _) => *v,
            (PopularityMetric::Stars, RawSourceRecord::Github(r)) => {
                r.stargazers_count.unwrap_or(0)
            }
            (PopularityMetric::Likes, RawSourceRecord::HuggingFace(m)) => m.likes.unwrap_or(0),
            (PopularityMetric::Downloads, RawSourceRecord::HuggingFace(m)) => {
                m.downloads.unwrap_or(0)
            }
            _ => 0,
        }
    }
}

/// Normalize one raw record retrieved under `category`.
pub fn normalize(
    raw: &RawSourceRecord,
    category: &str,
    now: DateTime<Utc>,
    popularity: &PopularityTable,
) -> Result<NormalizedRecord, NormalizationError> {
    let fields = match raw {
        RawSourceRecord::Github(r) => github_fields(r)?,
        RawSourceRecord::HuggingFace(m) => hf_fields(m)?,
        RawSourceRecord::Arxiv(e) => arxiv_fields(e)?,
    };
    let source = raw.source();
    let created_at = parse_timestamp(source, fields.created_at)?;

    Ok(NormalizedRecord {
        id: format!("{}:{}", source, fields.id),
        source,
        title: normalize_text(&fields.title),
        text: normalize_text(&fields.text),
        tags: fields.tags,
        author: fields.author,
        url: fields.url,
        created_at,
        metric_primary: popularity.metric_for(raw),
        age_days: age_days(created_at, now),
        category: category.to_string(),
    })
}

/// Days between `created_at` and `now`, never below 1.
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let days = (now - created_at).num_days();
    u64::try_from(days).unwrap_or(0).max(1)
}

/// Decode entities, strip markup, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > TEXT_CAP_CHARS {
        out = out.chars().take(TEXT_CAP_CHARS).collect();
    }
    out
}

// --- internals ---

struct Fields<'a> {
    id: String,
    url: String,
    title: String,
    text: String,
    tags: Vec<String>,
    author: Option<String>,
    created_at: Option<&'a str>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn github_fields(r: &GithubRepo) -> Result<Fields<'_>, NormalizationError> {
    let name = non_empty(r.full_name.as_deref()).ok_or(NormalizationError::MissingId(Source::Github))?;
    let url = non_empty(r.html_url.as_deref()).ok_or(NormalizationError::MissingUrl(Source::Github))?;
    let text = r.description.clone().unwrap_or_default();
    Ok(Fields {
        id: name.to_string(),
        url: url.to_string(),
        title: name.to_string(),
        text,
        tags: r.topics.clone(),
        author: r
            .owner
            .as_ref()
            .and_then(|o| non_empty(o.login.as_deref()))
            .map(str::to_string),
        created_at: r.created_at.as_deref(),
    })
}

fn hf_fields(m: &HfModel) -> Result<Fields<'_>, NormalizationError> {
    let id = non_empty(m.id.as_deref())
        .or_else(|| non_empty(m.model_id.as_deref()))
        .ok_or(NormalizationError::MissingId(Source::HuggingFace))?;
    let task = m.pipeline_tag.as_deref().map(|t| format!("Task: {t}"));
    let text = [task.as_deref(), m.card_description()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let author = non_empty(m.author.as_deref())
        .or_else(|| id.split('/').next())
        .map(str::to_string);
    Ok(Fields {
        id: id.to_string(),
        url: format!("https://huggingface.co/{id}"),
        title: id.to_string(),
        text,
        tags: m.tags.clone(),
        author,
        created_at: m.created_at.as_deref(),
    })
}

fn arxiv_fields(e: &ArxivEntry) -> Result<Fields<'_>, NormalizationError> {
    let entry_url = non_empty(e.id.as_deref()).ok_or(NormalizationError::MissingId(Source::Arxiv))?;
    // `http://arxiv.org/abs/2401.01234v2` -> `2401.01234v2`
    let id = entry_url
        .rsplit_once("/abs/")
        .map(|(_, id)| id)
        .unwrap_or(entry_url);
    let author = if e.authors.is_empty() {
        None
    } else {
        Some(e.authors.iter().take(2).cloned().collect::<Vec<_>>().join(", "))
    };
    Ok(Fields {
        id: id.to_string(),
        url: entry_url.to_string(),
        title: e.title.clone().unwrap_or_else(|| id.to_string()),
        text: e.summary.clone().unwrap_or_default(),
        tags: e.categories.clone(),
        author,
        created_at: e.published.as_deref(),
    })
}

fn parse_timestamp(source: Source, raw: Option<&str>) -> Result<DateTime<Utc>, NormalizationError> {
    let raw = non_empty(raw).ok_or(NormalizationError::MissingTimestamp(source))?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Some payloads carry bare dates.
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| NormalizationError::BadTimestamp {
            origin: source,
            raw: raw.to_string(),
        })
}
