use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Date format the history endpoint expects, day first (`31-12-2020`).
pub const DATE_WIRE_FORMAT: &str = "%d-%m-%Y";

/// Key the fetch date is merged under in every flattened record.
pub const DATE_FIELD: &str = "date";

/// Marker field set on records whose date could not be fetched cleanly.
pub const INGESTION_ERROR_FIELD: &str = "ingestion_error";

pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_WIRE_FORMAT).to_string()
}

/// The unprocessed response for one date, tagged with the date it was
/// requested for. The payload may be an API error body or a synthesized
/// degraded object; the tag is the only point of truth for ordering.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub date: NaiveDate,
    pub payload: Value,
}

/// One row destined for storage: dotted field path to leaf value. Fields the
/// API did not return are simply absent, never null-padded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatRecord {
    pub date: NaiveDate,
    pub values: BTreeMap<String, Value>,
}

impl FlatRecord {
    pub fn date_key(&self) -> String {
        format_date_key(self.date)
    }

    pub fn is_degraded(&self) -> bool {
        self.values.contains_key(INGESTION_ERROR_FIELD)
    }
}

/// Chronologically ordered output of one ingestion run.
pub type SnapshotBatch = Vec<FlatRecord>;
