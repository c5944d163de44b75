use std::path::Path;

use crate::commands::common::{format_mutation_lines, open_database};
use crate::error::CliError;

pub async fn run_queue(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let items = db.get_mutation_queue().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    for line in format_mutation_lines(&items) {
        println!("{line}");
    }
    Ok(())
}
