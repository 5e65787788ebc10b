// src/ingest/providers/github.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::{classify_status, http_client, network_error, with_backoff, RetryPolicy};
use crate::ingest::types::{GithubRepo, RawSourceRecord, Source, SourceClient, SourceError, SourceQuery};

pub const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<GithubRepo>,
}

/// Repository search, newest-created window, sorted by stars.
pub struct GithubClient {
    mode: Mode,
    retry: RetryPolicy,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        token: Option<String>,
        client: reqwest::Client,
    },
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(GITHUB_API, token)
    }

    pub fn with_base_url(base_url: &str, token: Option<String>) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                token: token.filter(|t| !t.trim().is_empty()),
                client: http_client(),
            },
            retry: RetryPolicy::default(),
        }
    }

    /// Serve a captured search payload instead of calling the API.
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn search_query(q: &SourceQuery) -> String {
        format!("{} created:>{}", q.query, q.since.format("%Y-%m-%d"))
    }

    async fn get_once(
        client: &reqwest::Client,
        base_url: &str,
        token: Option<&str>,
        q: &SourceQuery,
    ) -> Result<String, SourceError> {
        let per_page = q.limit.clamp(1, 100).to_string();
        let search = Self::search_query(q);
        let mut req = client
            .get(format!("{base_url}/search/repositories"))
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", search.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        let resp = req.send().await.map_err(network_error)?;
        let quota_exhausted = resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0");
        if let Some(err) = classify_status(resp.status(), quota_exhausted) {
            return Err(err);
        }
        resp.text().await.map_err(network_error)
    }
}

pub(crate) fn parse_search(body: &str, limit: usize) -> Result<Vec<RawSourceRecord>, SourceError> {
    let parsed: SearchResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(format!("github search: {e}")))?;
    Ok(parsed
        .items
        .into_iter()
        .take(limit)
        .map(RawSourceRecord::Github)
        .collect())
}

#[async_trait]
impl SourceClient for GithubClient {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawSourceRecord>, SourceError> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http {
                base_url,
                token,
                client,
            } => {
                let token = token.as_deref();
                with_backoff(&self.retry, Source::Github, move || {
                    Self::get_once(client, base_url, token, query)
                })
                .await?
            }
        };
        parse_search(&body, query.limit)
    }

    fn source(&self) -> Source {
        Source::Github
    }
}
