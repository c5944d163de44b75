use std::path::Path;

use fieldkit_core::config::ClientConfig;
use fieldkit_core::{MutationId, MutationKind, Resource};

use crate::commands::common::{build_engine, open_database, resolve_payload};
use crate::error::CliError;

pub async fn run_enqueue(
    resource: Resource,
    kind: MutationKind,
    payload: Option<&str>,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<MutationId, CliError> {
    let payload = resolve_payload(payload)?;
    let db = open_database(db_path).await?;
    let engine = build_engine(&db, config).await?;

    let (id, report) = engine.enqueue_and_sync(kind, resource, payload).await?;
    if let Some(reason) = &report.halted {
        tracing::info!("Sync after enqueue halted: {reason}");
    }
    let pending = db.count_mutations().await?;
    println!("{id}");
    if pending > 0 {
        eprintln!("{pending} mutation(s) pending");
    }
    Ok(id)
}
