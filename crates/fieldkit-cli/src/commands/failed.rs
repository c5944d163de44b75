use std::path::Path;

use fieldkit_core::MutationId;

use crate::commands::common::{format_failed_lines, open_database};
use crate::error::CliError;

pub async fn run_failed_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let failed = db.list_failed_mutations().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&failed)?);
        return Ok(());
    }

    if failed.is_empty() {
        println!("No failed mutations.");
        return Ok(());
    }

    for line in format_failed_lines(&failed) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_failed_retry(id: &str, db_path: &Path) -> Result<MutationId, CliError> {
    let id = parse_mutation_id(id)?;
    let db = open_database(db_path).await?;
    let item = db.requeue_failed_mutation(&id).await?;
    println!("{}", item.id);
    Ok(item.id)
}

pub async fn run_failed_clear(db_path: &Path) -> Result<usize, CliError> {
    let db = open_database(db_path).await?;
    let cleared = db.clear_failed_mutations().await?;
    println!("Cleared {cleared} failed mutation(s)");
    Ok(cleared)
}

pub fn parse_mutation_id(raw: &str) -> Result<MutationId, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::InvalidMutationId(raw.trim().to_string()))
}
