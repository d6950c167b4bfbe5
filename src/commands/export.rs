use crate::context::AppContext;
use anyhow::{Context, Result};
use log::info;
use serde_json::Value;
use std::path::Path;
use tokio::fs;

/// Dumps every persisted snapshot row to a JSON array file, the format the
/// dashboard reads.
pub async fn run(app: &AppContext, output_path: &Path) -> Result<()> {
    let db = app.database().await?;
    db.ensure_snapshot_table().await?;
    let records = db.fetch_all_snapshots().await?;

    let rows: Vec<Value> = records.into_iter().map(Value::Object).collect();
    let serialized = serde_json::to_string_pretty(&rows)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(output_path, serialized)
        .await
        .with_context(|| format!("failed to write snapshot export to {}", output_path.display()))?;

    info!(
        "Exported {} snapshot row(s) to {}",
        rows.len(),
        output_path.display()
    );
    Ok(())
}
