use crate::config::IngestConfig;
use crate::context::AppContext;
use crate::gecko::GeckoClient;
use crate::ingest::IngestionRunner;
use crate::planner::plan_range;
use crate::retry::retry_store_operation;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use reqwest::Client as HttpClient;

/// One full ingestion pass: plan the dates the store is missing, fetch and
/// flatten each in chronological order, then append the batch.
///
/// An unreachable store at the start only widens the plan to the epoch; an
/// unwritable store at the end is fatal, since a batch that cannot be
/// persisted would otherwise be silently lost work.
pub async fn run(app: &AppContext, config: &IngestConfig, today: NaiveDate) -> Result<()> {
    let latest = read_latest_stored_date(app).await;
    let dates = plan_range(latest, today, config.epoch);

    match dates.as_slice() {
        [] => info!("Store already covers {}; nothing to fetch", today),
        [only] => info!("Fetching 1 day of {} history: {}", config.coin_id, only),
        [first, .., last] => info!(
            "Fetching {} day(s) of {} history: {} - {}",
            dates.len(),
            config.coin_id,
            first,
            last
        ),
    }

    let http = HttpClient::new();
    let client = GeckoClient::new(&http, config)?;
    let batch = IngestionRunner::new(client, dates).run().await;

    let mut db = app
        .database()
        .await
        .context("snapshot store unavailable for writing")?;
    db.ensure_snapshot_table().await?;
    let appended = retry_store_operation!("snapshot append", db.append_snapshots(&batch))
        .context("failed to persist snapshot batch")?;
    info!("Appended {} snapshot row(s)", appended);

    Ok(())
}

async fn read_latest_stored_date(app: &AppContext) -> Option<NaiveDate> {
    let db = match app.database().await {
        Ok(db) => db,
        Err(err) => {
            warn!(
                "Snapshot store unavailable ({}). Starting from the epoch date.",
                err
            );
            return None;
        }
    };

    match db.latest_snapshot_date().await {
        Ok(latest) => latest,
        Err(err) => {
            warn!(
                "Could not read the latest stored date ({}). Starting from the epoch date.",
                err
            );
            None
        }
    }
}
