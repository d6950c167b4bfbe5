use crate::models::{FlatRecord, SnapshotBatch};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::error;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Transaction};

const SNAPSHOT_TABLE: &str = "snapshots";
const DATE_COLUMN: &str = "snapshot_date";
const INGESTED_AT_COLUMN: &str = "ingested_at";

/// Append-only snapshot store.
///
/// The table starts with just the typed date key and grows one JSONB column
/// per dotted field path as the API surfaces new fields. Existing rows are
/// never rewritten by this pipeline.
pub struct Database {
    client: Client,
}

impl Database {
    pub async fn new<S: AsRef<str>>(database_url: S) -> Result<Self> {
        let database_url = database_url.as_ref().to_string();
        let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
            .await
            .with_context(|| format!("failed to connect to PostgreSQL at {}", database_url))?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!("PostgreSQL connection error: {}", err);
            }
        });

        Ok(Self { client })
    }

    pub async fn ensure_snapshot_table(&self) -> Result<()> {
        self.client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS snapshots (
                     snapshot_date DATE NOT NULL,
                     ingested_at TIMESTAMPTZ NOT NULL DEFAULT now()
                 )",
            )
            .await
            .context("failed to create snapshot table")?;
        Ok(())
    }

    /// Newest date present in the table, or `None` when the table is empty
    /// or has not been created yet (the first ever run).
    pub async fn latest_snapshot_date(&self) -> Result<Option<NaiveDate>> {
        match self
            .client
            .query_one("SELECT MAX(snapshot_date) FROM snapshots", &[])
            .await
        {
            Ok(row) => Ok(row.get(0)),
            Err(err) if err.code() == Some(&SqlState::UNDEFINED_TABLE) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Appends every record of the batch in one transaction, widening the
    /// schema first for dotted paths the table has not seen yet. Fields a
    /// record lacks are left SQL NULL by omission. An empty batch is a no-op.
    pub async fn append_snapshots(&mut self, batch: &SnapshotBatch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut known_columns = self.snapshot_columns().await?;
        let tx = self.client.transaction().await?;

        for record in batch {
            for path in record.values.keys() {
                if known_columns.contains(path) {
                    continue;
                }
                tx.batch_execute(&format!(
                    "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} JSONB",
                    SNAPSHOT_TABLE,
                    quote_ident(path)
                ))
                .await
                .with_context(|| format!("failed to add snapshot column for {}", path))?;
                known_columns.insert(path.clone());
            }
        }

        for record in batch {
            insert_record(&tx, record).await?;
        }

        tx.commit().await?;
        Ok(batch.len())
    }

    /// Every persisted row in chronological order, dynamic columns
    /// reassembled into flat JSON objects. NULL cells are omitted so absent
    /// fields stay absent in the export.
    pub async fn fetch_all_snapshots(&self) -> Result<Vec<Map<String, Value>>> {
        let rows = self
            .client
            .query(
                "SELECT * FROM snapshots ORDER BY snapshot_date, ingested_at",
                &[],
            )
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = Map::new();
            for (idx, column) in row.columns().iter().enumerate() {
                match column.name() {
                    DATE_COLUMN => {
                        let date: NaiveDate = row.get(idx);
                        record.insert(
                            DATE_COLUMN.to_string(),
                            Value::String(date.format("%Y-%m-%d").to_string()),
                        );
                    }
                    INGESTED_AT_COLUMN => {
                        let ingested_at: DateTime<Utc> = row.get(idx);
                        record.insert(
                            INGESTED_AT_COLUMN.to_string(),
                            Value::String(ingested_at.to_rfc3339()),
                        );
                    }
                    name => {
                        if let Some(value) = row.get::<_, Option<Value>>(idx) {
                            record.insert(name.to_string(), value);
                        }
                    }
                }
            }
            records.push(record);
        }

        Ok(records)
    }

    async fn snapshot_columns(&self) -> Result<HashSet<String>> {
        let rows = self
            .client
            .query(
                "SELECT column_name FROM information_schema.columns
                 WHERE table_schema = current_schema() AND table_name = $1",
                &[&SNAPSHOT_TABLE],
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }
}

async fn insert_record(tx: &Transaction<'_>, record: &FlatRecord) -> Result<()> {
    let mut columns = vec![quote_ident(DATE_COLUMN)];
    let mut placeholders = vec!["$1".to_string()];
    let mut params: Vec<&(dyn ToSql + Sync)> = vec![&record.date];

    for (idx, (path, value)) in record.values.iter().enumerate() {
        columns.push(quote_ident(path));
        placeholders.push(format!("${}", idx + 2));
        params.push(value);
    }

    let statement = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        SNAPSHOT_TABLE,
        columns.join(", "),
        placeholders.join(", ")
    );
    tx.execute(statement.as_str(), &params)
        .await
        .with_context(|| format!("failed to append snapshot for {}", record.date_key()))?;
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::quote_ident;

    #[test]
    fn identifiers_are_quoted_and_escaped() {
        assert_eq!(quote_ident("snapshot_date"), "\"snapshot_date\"");
        assert_eq!(
            quote_ident("market_data.current_price.usd"),
            "\"market_data.current_price.usd\""
        );
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
