use crate::flatten::flatten_snapshot;
use crate::gecko::GeckoClient;
use crate::models::{FlatRecord, SnapshotBatch};
use chrono::NaiveDate;
use log::{info, warn};

/// Drives one fetch + normalize cycle per planned date, strictly in sequence,
/// accumulating the results into a chronological batch.
///
/// The runner never persists anything itself; the completed batch is handed
/// back to the caller whole. An interrupted run therefore leaves the store
/// untouched, and the next run re-plans from whatever was durably stored.
pub struct IngestionRunner<'a> {
    client: GeckoClient<'a>,
    dates: Vec<NaiveDate>,
}

impl<'a> IngestionRunner<'a> {
    pub fn new(client: GeckoClient<'a>, dates: Vec<NaiveDate>) -> Self {
        Self { client, dates }
    }

    pub async fn run(self) -> SnapshotBatch {
        let Self { client, dates } = self;
        let total = dates.len();
        let mut batch = Vec::with_capacity(total);

        for (index, date) in dates.into_iter().enumerate() {
            let snapshot = client.fetch_history(date).await;
            let record = flatten_snapshot(snapshot);
            log_progress(index, total, &record);
            batch.push(record);
        }

        batch
    }
}

fn log_progress(index: usize, total: usize, record: &FlatRecord) {
    if record.is_degraded() {
        warn!(
            "[{}/{}] degraded snapshot for {}",
            index + 1,
            total,
            record.date_key()
        );
    } else {
        info!(
            "[{}/{}] fetched snapshot for {}",
            index + 1,
            total,
            record.date_key()
        );
    }
}
