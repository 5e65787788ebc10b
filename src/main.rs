//! Trend scanner service: runs one scan at startup, then serves the report.

use shuttle_axum::ShuttleAxum;

use ts_trend_scanner::api::{self, AppState};
use ts_trend_scanner::config::ScanConfig;
use ts_trend_scanner::metrics::Metrics;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    ts_trend_scanner::init_tracing();

    let cfg = ScanConfig::from_env();
    let metrics = Metrics::init(cfg.limit, cfg.days)?;

    let doc = ts_trend_scanner::scan_live(&cfg).await?;
    let state = AppState::new(doc)?;

    Ok(api::router(state, Some(&metrics)).into())
}
