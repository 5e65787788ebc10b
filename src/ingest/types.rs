// src/ingest/types.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three platforms a scan pulls from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Github,
    HuggingFace,
    Arxiv,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Github, Source::HuggingFace, Source::Arxiv];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Github => "github",
            Source::HuggingFace => "huggingface",
            Source::Arxiv => "arxiv",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository item as returned by the GitHub search API.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct GithubRepo {
    pub full_name: Option<String>,
    pub html_url: Option<String>,
    pub description: Option<String>,
    pub stargazers_count: Option<u64>,
    pub created_at: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub owner: Option<GithubOwner>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct GithubOwner {
    pub login: Option<String>,
}

/// Model card summary as returned by the Hugging Face `/api/models` listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct HfModel {
    pub id: Option<String>,
    #[serde(rename = "modelId")]
    pub model_id: Option<String>,
    pub author: Option<String>,
    pub likes: Option<u64>,
    pub downloads: Option<u64>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    pub pipeline_tag: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Card front matter, present with `full=true`. Free-form YAML, kept loose.
    #[serde(rename = "cardData", default)]
    pub card_data: Option<serde_json::Value>,
}

impl HfModel {
    /// Short prose from the model card, when the author wrote one.
    pub fn card_description(&self) -> Option<&str> {
        let card = self.card_data.as_ref()?;
        ["description", "model_description", "summary"]
            .iter()
            .filter_map(|k| card.get(*k).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// One arXiv Atom entry, flattened out of the feed.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ArxivEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Source-specific record, discarded after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSourceRecord {
    Github(GithubRepo),
    HuggingFace(HfModel),
    Arxiv(ArxivEntry),
}

impl RawSourceRecord {
    pub fn source(&self) -> Source {
        match self {
            RawSourceRecord::Github(_) => Source::Github,
            RawSourceRecord::HuggingFace(_) => Source::HuggingFace,
            RawSourceRecord::Arxiv(_) => Source::Arxiv,
        }
    }
}

/// One category sub-query against one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub category: String,
    pub query: String,
    pub limit: usize,
    pub since: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("rate limited after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },
    #[error("network failure: {0}")]
    Network(String),
    #[error("undecodable payload: {0}")]
    Decode(String),
}

impl SourceError {
    /// Only rate limiting is worth another attempt inside a client.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }
}

#[async_trait::async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawSourceRecord>, SourceError>;
    fn source(&self) -> Source;
}

/// Why a query or record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    RateLimit,
    Network,
    Decode,
    Normalization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Network => "network",
            ErrorKind::Decode => "decode",
            ErrorKind::Normalization => "normalization",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&SourceError> for ErrorKind {
    fn from(e: &SourceError) -> Self {
        match e {
            SourceError::Auth(_) => ErrorKind::Auth,
            SourceError::RateLimited { .. } => ErrorKind::RateLimit,
            SourceError::Network(_) => ErrorKind::Network,
            SourceError::Decode(_) => ErrorKind::Decode,
        }
    }
}

/// One skip reason in the run's error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub source: Source,
    pub category: Option<String>,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Per-source success/failure counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub queries_ok: u32,
    pub queries_failed: u32,
    pub fetched: u64,
    pub normalized: u64,
    pub skipped: u64,
}

impl SourceCounts {
    /// A source succeeded if at least one of its queries came back.
    pub fn succeeded(&self) -> bool {
        self.queries_ok > 0
    }
}
