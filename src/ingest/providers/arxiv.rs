// src/ingest/providers/arxiv.rs
use async_trait::async_trait;
use chrono::NaiveTime;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::{classify_status, http_client, network_error, with_backoff, RetryPolicy};
use crate::ingest::types::{ArxivEntry, RawSourceRecord, Source, SourceClient, SourceError, SourceQuery};

pub const ARXIV_API: &str = "https://export.arxiv.org";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

fn parse_rfc3339_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .map(|dt| dt.unix_timestamp())
}

/// Preprint search through the arXiv Atom API, newest submissions first.
pub struct ArxivClient {
    mode: Mode,
    retry: RetryPolicy,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl ArxivClient {
    pub fn new() -> Self {
        Self::with_base_url(ARXIV_API)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client: http_client(),
            },
            retry: RetryPolicy::default(),
        }
    }

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

    async fn get_once(
        client: &reqwest::Client,
        base_url: &str,
        q: &SourceQuery,
    ) -> Result<String, SourceError> {
        let max_results = q.limit.max(1).to_string();
        let resp = client
            .get(format!("{base_url}/api/query"))
            .query(&[
                ("search_query", q.query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(network_error)?;
        if let Some(err) = classify_status(resp.status(), false) {
            return Err(err);
        }
        resp.text().await.map_err(network_error)
    }
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an Atom feed, keeping entries published on or after `since`.
/// Entries with an unreadable date are kept so normalization can report them.
pub(crate) fn parse_feed(xml: &str, q: &SourceQuery) -> Result<Vec<RawSourceRecord>, SourceError> {
    let feed: Feed = from_str(xml).map_err(|e| SourceError::Decode(format!("arxiv atom: {e}")))?;
    let since_ts = q.since.and_time(NaiveTime::MIN).and_utc().timestamp();

    let mut out = Vec::with_capacity(feed.entries.len());
    for e in feed.entries {
        let recent = e
            .published
            .as_deref()
            .and_then(parse_rfc3339_to_unix)
            .map_or(true, |ts| ts >= since_ts);
        if !recent {
            continue;
        }
        out.push(RawSourceRecord::Arxiv(ArxivEntry {
            id: e.id.map(|s| s.trim().to_string()),
            title: e.title,
            summary: e.summary,
            published: e.published,
            authors: e.authors.into_iter().filter_map(|a| a.name).collect(),
            categories: e.categories.into_iter().filter_map(|c| c.term).collect(),
        }));
        if out.len() >= q.limit {
            break;
        }
    }
    Ok(out)
}

#[async_trait]
impl SourceClient for ArxivClient {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawSourceRecord>, SourceError> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { base_url, client } => {
                with_backoff(&self.retry, Source::Arxiv, move || {
                    Self::get_once(client, base_url, query)
                })
                .await?
            }
        };
        parse_feed(&body, query)
    }

    fn source(&self) -> Source {
        Source::Arxiv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/2405.00001v1</id>
    <updated>2024-05-02T00:00:00Z</updated>
    <published>2024-05-01T00:00:00Z</published>
    <title>Chronos-X: state of the art
      forecasting</title>
    <summary>We outperform strong baselines.</summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2405.00001v1" rel="alternate" type="text/html"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="stat.ML" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2001.00002v3</id>
    <published>2020-01-01T00:00:00Z</published>
    <title>Old paper</title>
    <summary>Too old.</summary>
    <author><name>Someone</name></author>
  </entry>
</feed>"#;

    fn query(limit: usize) -> SourceQuery {
        SourceQuery {
            category: "Forecasting".into(),
            query: r#"all:"time series forecasting""#.into(),
            limit,
            since: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        }
    }

    #[test]
    fn parses_entries_and_drops_old_ones() {
        let out = parse_feed(FEED, &query(10)).unwrap();
        assert_eq!(out.len(), 1);
        let RawSourceRecord::Arxiv(e) = &out[0] else {
            panic!("wrong variant");
        };
        assert_eq!(e.id.as_deref(), Some("http://arxiv.org/abs/2405.00001v1"));
        assert_eq!(e.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(e.categories, vec!["cs.LG", "stat.ML"]);
    }

    #[test]
    fn empty_feed_is_ok() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;
        assert!(parse_feed(xml, &query(5)).unwrap().is_empty());
    }

    #[test]
    fn rfc3339_parsing() {
        assert_eq!(parse_rfc3339_to_unix("1970-01-01T00:01:00Z"), Some(60));
        assert_eq!(parse_rfc3339_to_unix("yesterday"), None);
    }
}
