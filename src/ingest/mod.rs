// src/ingest/mod.rs
//! Fetch every (category, source) query concurrently, wait for all of them,
//! then normalize. A failing query only costs its own records.

pub mod normalize;
pub mod providers;
pub mod types;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::categories::Category;
use crate::ingest::normalize::{normalize, NormalizedRecord, PopularityTable};
use crate::ingest::types::{
    ErrorEntry, ErrorKind, RawSourceRecord, Source, SourceClient, SourceCounts, SourceError,
    SourceQuery,
};

pub use crate::ingest::normalize::normalize_text;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scan_records_fetched_total", "Raw records returned by sources.");
        describe_counter!(
            "scan_records_normalized_total",
            "Records that passed normalization."
        );
        describe_counter!(
            "scan_records_skipped_total",
            "Records skipped by normalization."
        );
        describe_counter!("scan_source_errors_total", "Failed source queries.");
        describe_counter!(
            "scan_rate_limit_retries_total",
            "Backoff retries after a rate-limit signal."
        );
        describe_histogram!("scan_fetch_ms", "Per-query fetch time in milliseconds.");
    });
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchConfig {
    pub limit: usize,
    pub since: NaiveDate,
    /// In-flight queries allowed per source.
    pub concurrency: usize,
}

/// Result of one (category, source) query.
#[derive(Debug)]
pub struct FetchOutcome {
    pub source: Source,
    pub category: String,
    pub result: Result<Vec<RawSourceRecord>, SourceError>,
}

/// Normalized records plus the run log.
#[derive(Debug, Default)]
pub struct IngestOutput {
    pub records: Vec<NormalizedRecord>,
    pub counts: BTreeMap<Source, SourceCounts>,
    pub errors: Vec<ErrorEntry>,
}

/// Issue every query with a per-source concurrency bound and join them all.
/// Outcomes come back in category order, then client order.
pub async fn fetch_all(
    clients: &[Arc<dyn SourceClient>],
    categories: &[Category],
    cfg: &FetchConfig,
) -> Vec<FetchOutcome> {
    ensure_metrics_described();

    let permits: BTreeMap<Source, Arc<Semaphore>> = clients
        .iter()
        .map(|c| (c.source(), Arc::new(Semaphore::new(cfg.concurrency.max(1)))))
        .collect();

    let mut handles = Vec::new();
    for cat in categories {
        for client in clients {
            let source = client.source();
            let Some(q) = cat.query_for(source) else {
                continue;
            };
            let query = SourceQuery {
                category: cat.name.clone(),
                query: q.to_string(),
                limit: cfg.limit,
                since: cfg.since,
            };
            let client = Arc::clone(client);
            let sem = Arc::clone(&permits[&source]);
            let handle = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await;
                let t0 = std::time::Instant::now();
                let result = client.fetch(&query).await;
                histogram!("scan_fetch_ms", "source" => source.as_str())
                    .record(t0.elapsed().as_secs_f64() * 1_000.0);
                result
            });
            handles.push((source, cat.name.clone(), handle));
        }
    }

    let mut out = Vec::with_capacity(handles.len());
    for (source, category, handle) in handles {
        let result = match handle.await {
            Ok(r) => r,
            Err(e) => Err(SourceError::Network(format!("fetch task aborted: {e}"))),
        };
        out.push(FetchOutcome {
            source,
            category,
            result,
        });
    }
    out
}

/// Normalize every fetched record, tallying successes and skip reasons.
pub fn normalize_outcomes(
    outcomes: Vec<FetchOutcome>,
    now: DateTime<Utc>,
    popularity: &PopularityTable,
) -> IngestOutput {
    let mut output = IngestOutput::default();
    for outcome in outcomes {
        let counts = output.counts.entry(outcome.source).or_default();
        match outcome.result {
            Ok(raws) => {
                counts.queries_ok += 1;
                counts.fetched += raws.len() as u64;
                counter!("scan_records_fetched_total", "source" => outcome.source.as_str())
                    .increment(raws.len() as u64);
                for raw in &raws {
                    match normalize(raw, &outcome.category, now, popularity) {
                        Ok(rec) => {
                            counts.normalized += 1;
                            output.records.push(rec);
                        }
                        Err(e) => {
                            counts.skipped += 1;
                            counter!("scan_records_skipped_total", "source" => outcome.source.as_str())
                                .increment(1);
                            tracing::debug!(source = %outcome.source, category = %outcome.category, error = %e, "record skipped");
                            output.errors.push(ErrorEntry {
                                source: outcome.source,
                                category: Some(outcome.category.clone()),
                                kind: ErrorKind::Normalization,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
            Err(e) => {
                counts.queries_failed += 1;
                counter!("scan_source_errors_total", "source" => outcome.source.as_str())
                    .increment(1);
                tracing::warn!(source = %outcome.source, category = %outcome.category, error = %e, "source query failed");
                output.errors.push(ErrorEntry {
                    source: outcome.source,
                    category: Some(outcome.category),
                    kind: ErrorKind::from(&e),
                    reason: e.to_string(),
                });
            }
        }
    }
    let normalized = output.records.len() as u64;
    counter!("scan_records_normalized_total").increment(normalized);
    output
}

/// Fetch, barrier-join and normalize in one step.
pub async fn run_once(
    clients: &[Arc<dyn SourceClient>],
    categories: &[Category],
    cfg: &FetchConfig,
    now: DateTime<Utc>,
    popularity: &PopularityTable,
) -> IngestOutput {
    let outcomes = fetch_all(clients, categories, cfg).await;
    normalize_outcomes(outcomes, now, popularity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::GithubRepo;
    use chrono::TimeZone;

    fn repo(name: Option<&str>) -> RawSourceRecord {
        RawSourceRecord::Github(GithubRepo {
            full_name: name.map(str::to_string),
            html_url: Some("https://github.com/x".into()),
            stargazers_count: Some(5),
            created_at: Some("2024-01-01T00:00:00Z".into()),
            ..Default::default()
        })
    }

    #[test]
    fn normalization_failures_are_counted_not_fatal() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let outcomes = vec![
            FetchOutcome {
                source: Source::Github,
                category: "A".into(),
                result: Ok(vec![repo(Some("a/b")), repo(None), repo(Some("c/d"))]),
            },
            FetchOutcome {
                source: Source::Arxiv,
                category: "A".into(),
                result: Err(SourceError::Network("timeout".into())),
            },
        ];
        let out = normalize_outcomes(outcomes, now, &PopularityTable::default());
        assert_eq!(out.records.len(), 2);
        let gh = out.counts[&Source::Github];
        assert_eq!((gh.queries_ok, gh.fetched, gh.normalized, gh.skipped), (1, 3, 2, 1));
        let ax = out.counts[&Source::Arxiv];
        assert_eq!((ax.queries_ok, ax.queries_failed), (0, 1));
        assert_eq!(out.errors.len(), 2);
        assert_eq!(out.errors[0].kind, ErrorKind::Normalization);
        assert_eq!(out.errors[1].kind, ErrorKind::Network);
    }
}
