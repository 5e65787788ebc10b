// src/pipeline.rs
//! One run: fetch → normalize → extract → score → assemble.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::analyze::Analyzer;
use crate::categories::Category;
use crate::config::ScanConfig;
use crate::ingest::normalize::PopularityTable;
use crate::ingest::providers::{ArxivClient, GithubClient, HuggingFaceClient};
use crate::ingest::types::{ErrorEntry, SourceClient};
use crate::ingest::{run_once, FetchConfig};
use crate::report::{assemble, ReportDocument};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("every source failed ({} errors logged)", errors.len())]
    AllSourcesFailed { errors: Vec<ErrorEntry> },
}

/// The live clients for all three sources.
pub fn default_clients(cfg: &ScanConfig) -> Vec<Arc<dyn SourceClient>> {
    vec![
        Arc::new(GithubClient::new(cfg.github_token.clone())),
        Arc::new(HuggingFaceClient::new()),
        Arc::new(ArxivClient::new()),
    ]
}

/// Read-only inputs shared by every record in a run.
pub struct Pipeline {
    clients: Vec<Arc<dyn SourceClient>>,
    categories: Vec<Category>,
    analyzer: Analyzer,
    popularity: PopularityTable,
}

impl Pipeline {
    pub fn new(clients: Vec<Arc<dyn SourceClient>>, categories: Vec<Category>, analyzer: Analyzer) -> Self {
        Self {
            clients,
            categories,
            analyzer,
            popularity: PopularityTable::default(),
        }
    }

    pub fn with_popularity(mut self, popularity: PopularityTable) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Partial results are fine; the run only fails when no source answered
    /// a single query.
    pub async fn run(&self, cfg: &FetchConfig, now: DateTime<Utc>) -> Result<ReportDocument, PipelineError> {
        let t0 = Instant::now();
        tracing::info!(
            categories = self.categories.len(),
            sources = self.clients.len(),
            limit = cfg.limit,
            since = %cfg.since,
            "scan started"
        );

        let ingest = run_once(&self.clients, &self.categories, cfg, now, &self.popularity).await;

        if !ingest.counts.values().any(|c| c.succeeded()) {
            tracing::warn!(errors = ingest.errors.len(), "no source returned data");
            return Err(PipelineError::AllSourcesFailed { errors: ingest.errors });
        }

        let scored: Vec<_> = ingest
            .records
            .into_iter()
            .map(|r| self.analyzer.score(r))
            .collect();

        let order: Vec<String> = self.categories.iter().map(|c| c.name.clone()).collect();
        let doc = assemble(&order, scored, ingest.counts, ingest.errors, now);

        tracing::info!(
            records = doc.total_records(),
            errors = doc.errors.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "scan finished"
        );
        Ok(doc)
    }
}
