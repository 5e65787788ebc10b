// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod api;
pub mod categories;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod view;

pub use crate::api::router;
pub use crate::pipeline::{Pipeline, PipelineError};
pub use crate::report::ReportDocument;

use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::analyze::Analyzer;
use crate::categories::load_categories_default;
use crate::config::ScanConfig;

/// Compact logs by default, JSON lines when `LOG_FORMAT=json`.
/// Filter from `RUST_LOG`, else `ts_trend_scanner=info,warn`.
/// Returns false when a subscriber was already installed, e.g. by a host runtime.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ts_trend_scanner=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).try_init().is_ok()
    } else {
        registry.with(fmt::layer().compact()).try_init().is_ok()
    }
}

/// Load configuration files, query the live sources and assemble the report.
pub async fn scan_live(cfg: &ScanConfig) -> anyhow::Result<ReportDocument> {
    tracing::info!(
        limit = cfg.limit,
        days = cfg.days,
        concurrency = cfg.concurrency,
        arxiv_baseline = cfg.arxiv_baseline,
        github_token = ?cfg.token_fingerprint(),
        "configuration loaded"
    );
    if cfg.github_token.is_none() {
        tracing::warn!("GITHUB_TOKEN not set; GitHub search runs with the anonymous rate limit");
    }

    let categories = load_categories_default().context("load categories")?;
    let analyzer = Analyzer::from_config().context("load feature rules and weights")?;
    let pipeline = Pipeline::new(pipeline::default_clients(cfg), categories, analyzer)
        .with_popularity(cfg.popularity_table());

    let now = Utc::now();
    let doc = pipeline.run(&cfg.fetch_config(now.date_naive()), now).await?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    #[test]
    fn second_tracing_init_is_a_no_op() {
        super::init_tracing();
        assert!(!super::init_tracing());
    }
}
