//! One-shot scan: query all sources, write the HTML report, exit.
//!
//! Exit code 1 when every source failed or configuration is broken.

use anyhow::Context;

use ts_trend_scanner::config::ScanConfig;
use ts_trend_scanner::report::html::write_report;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    ts_trend_scanner::init_tracing();

    let cfg = ScanConfig::from_env();
    let doc = ts_trend_scanner::scan_live(&cfg).await?;
    write_report(&cfg.output_path, &doc)
        .with_context(|| format!("report output {}", cfg.output_path.display()))?;

    for (source, c) in &doc.per_source_counts {
        println!(
            "{source}: {} ok / {} failed queries, {} records, {} skipped",
            c.queries_ok, c.queries_failed, c.normalized, c.skipped
        );
    }
    println!("report: {}", cfg.output_path.display());
    Ok(())
}
