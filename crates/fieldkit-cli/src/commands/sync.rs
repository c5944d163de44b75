use std::path::Path;

use fieldkit_core::config::ClientConfig;
use fieldkit_core::sync::SyncReport;

use crate::commands::common::{build_engine, open_database};
use crate::error::CliError;

/// Run one pass against the configured API. With `offline` set in the
/// config the pass is skipped and the report says so.
pub async fn run_sync(
    as_json: bool,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<SyncReport, CliError> {
    config.require_api_base_url()?;

    let db = open_database(db_path).await?;
    let engine = build_engine(&db, config).await?;
    let report = engine.trigger_sync().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
        let pending = db.count_mutations().await?;
        println!("{pending} mutation(s) still pending");
    }
    Ok(report)
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "processed={} failed={} dead_lettered={} dropped={}",
        report.processed, report.failed, report.dead_lettered, report.dropped
    )];
    if report.photos_uploaded > 0 || report.photos_failed > 0 {
        lines.push(format!(
            "photos uploaded={} failed={}",
            report.photos_uploaded, report.photos_failed
        ));
    }
    if let Some(reason) = &report.halted {
        lines.push(format!("halted: {reason}"));
    }
    lines
}
