use crate::models::{format_date_key, FlatRecord, RawSnapshot, DATE_FIELD};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flattens one raw snapshot into a single-level record keyed by dotted
/// paths (`market_data.current_price.usd`).
///
/// Only objects are descended into; arrays, scalars and null stay leaf values
/// under their computed path. Fields the payload lacks simply do not appear.
/// The fetch date is merged in last under `date`, so a conflicting payload
/// key can never override it.
pub fn flatten_snapshot(snapshot: RawSnapshot) -> FlatRecord {
    let RawSnapshot { date, payload } = snapshot;
    let mut values = BTreeMap::new();

    match payload {
        Value::Object(map) => flatten_object(map, None, &mut values),
        // A top-level non-object is unexpected but should not be dropped.
        other => {
            values.insert("payload".to_string(), other);
        }
    }

    values.insert(
        DATE_FIELD.to_string(),
        Value::String(format_date_key(date)),
    );

    FlatRecord { date, values }
}

fn flatten_object(
    map: Map<String, Value>,
    prefix: Option<&str>,
    out: &mut BTreeMap<String, Value>,
) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };
        match value {
            Value::Object(nested) => flatten_object(nested, Some(&path), out),
            leaf => {
                out.insert(path, leaf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::flatten_snapshot;
    use crate::models::RawSnapshot;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    fn snapshot_for(payload: Value) -> RawSnapshot {
        RawSnapshot {
            date: NaiveDate::from_ymd_opt(2020, 1, 3).expect("valid date"),
            payload,
        }
    }

    #[test]
    fn nested_objects_become_dotted_paths() {
        let record = flatten_snapshot(snapshot_for(json!({
            "name": "Ethereum",
            "market_data": {
                "current_price": { "usd": 127.97, "btc": 0.0177 },
                "total_volume": { "usd": 7_155_236_634.0 }
            },
            "public_interest_stats": { "alexa_rank": 7522 }
        })));

        assert_eq!(record.values["name"], "Ethereum");
        assert_eq!(record.values["market_data.current_price.usd"], 127.97);
        assert_eq!(record.values["market_data.current_price.btc"], 0.0177);
        assert_eq!(
            record.values["market_data.total_volume.usd"],
            7_155_236_634.0
        );
        assert_eq!(record.values["public_interest_stats.alexa_rank"], 7522);
        assert!(!record.values.contains_key("market_data"));
    }

    #[test]
    fn arrays_and_null_stay_leaves() {
        let record = flatten_snapshot(snapshot_for(json!({
            "categories": ["smart-contracts", "ethereum-ecosystem"],
            "description": null,
            "market_data": { "sparkline": [1.0, 2.0, 3.0] }
        })));

        assert_eq!(
            record.values["categories"],
            json!(["smart-contracts", "ethereum-ecosystem"])
        );
        assert_eq!(record.values["description"], Value::Null);
        assert_eq!(record.values["market_data.sparkline"], json!([1.0, 2.0, 3.0]));
    }

    #[test]
    fn injected_date_wins_over_payload_conflict() {
        let record = flatten_snapshot(snapshot_for(json!({
            "date": "not-the-real-date",
            "symbol": "eth"
        })));

        assert_eq!(record.values["date"], "03-01-2020");
        assert_eq!(record.values["symbol"], "eth");
    }

    #[test]
    fn flat_input_passes_through_unchanged_plus_date() {
        let record = flatten_snapshot(snapshot_for(json!({
            "name": "Ethereum",
            "symbol": "eth",
            "block_time_in_minutes": 0
        })));

        assert_eq!(record.values.len(), 4);
        assert_eq!(record.values["name"], "Ethereum");
        assert_eq!(record.values["symbol"], "eth");
        assert_eq!(record.values["block_time_in_minutes"], 0);
        assert_eq!(record.values["date"], "03-01-2020");
    }

    #[test]
    fn missing_branches_are_absent_not_null() {
        let record = flatten_snapshot(snapshot_for(json!({ "name": "Ethereum" })));

        assert!(record
            .values
            .keys()
            .all(|path| !path.starts_with("market_data")));
    }

    #[test]
    fn non_object_payload_is_preserved_under_payload_key() {
        let record = flatten_snapshot(snapshot_for(json!("service unavailable")));

        assert_eq!(record.values["payload"], "service unavailable");
        assert_eq!(record.values["date"], "03-01-2020");
    }
}
