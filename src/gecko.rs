use crate::config::IngestConfig;
use crate::models::{format_date_key, RawSnapshot, INGESTION_ERROR_FIELD};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::warn;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

const API_KEY_HEADER: &str = "X-RapidAPI-Key";
const API_HOST_HEADER: &str = "X-RapidAPI-Host";
const REQUEST_DELAY: Duration = Duration::from_millis(350);

pub struct GeckoClient<'a> {
    http: &'a Client,
    base_url: String,
    coin_id: String,
    headers: HeaderMap,
}

impl<'a> GeckoClient<'a> {
    pub fn new(http: &'a Client, config: &IngestConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&config.api_key).context("invalid RapidAPI key")?,
        );
        headers.insert(
            API_HOST_HEADER,
            HeaderValue::from_str(&config.api_host).context("invalid RapidAPI host")?,
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            coin_id: config.coin_id.clone(),
            headers,
        })
    }

    /// Fetches the market snapshot for one date with a single GET.
    ///
    /// Never fails for a single date: an error body is returned as received
    /// and transport failures or unparsable bodies yield a synthesized
    /// payload, both tagged with `ingestion_error`, so one bad day cannot
    /// abort a whole run. Calls are paced by a fixed delay; the remote rate
    /// limit is respected purely through serialization.
    pub async fn fetch_history(&self, date: NaiveDate) -> RawSnapshot {
        sleep(REQUEST_DELAY).await;
        let date_key = format_date_key(date);
        let payload = match self.request_snapshot(&date_key).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Snapshot request for {} failed: {:#}", date_key, err);
                json!({ INGESTION_ERROR_FIELD: format!("{:#}", err) })
            }
        };
        RawSnapshot { date, payload }
    }

    async fn request_snapshot(&self, date_key: &str) -> Result<Value> {
        let url = format!("{}/coins/{}/history", self.base_url, self.coin_id);
        let response = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .query(&[("date", date_key), ("localization", "false")])
            .send()
            .await
            .with_context(|| format!("GET {} failed for {}", url, date_key))?;

        let status = response.status();
        let mut payload = response
            .json::<Value>()
            .await
            .with_context(|| format!("failed to parse history response for {}", date_key))?;

        if !status.is_success() {
            warn!("History request for {} returned status {}", date_key, status);
            tag_error_payload(&mut payload, &format!("http status {}", status));
        }

        Ok(payload)
    }
}

fn tag_error_payload(payload: &mut Value, reason: &str) {
    match payload {
        Value::Object(map) => {
            map.insert(
                INGESTION_ERROR_FIELD.to_string(),
                Value::String(reason.to_string()),
            );
        }
        other => {
            *other = json!({ INGESTION_ERROR_FIELD: reason, "payload": other.clone() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::tag_error_payload;
    use crate::models::INGESTION_ERROR_FIELD;
    use serde_json::json;

    #[test]
    fn error_tag_is_added_to_object_bodies() {
        let mut payload = json!({ "status": { "error_code": 429 } });
        tag_error_payload(&mut payload, "http status 429");
        assert_eq!(payload[INGESTION_ERROR_FIELD], "http status 429");
        assert_eq!(payload["status"]["error_code"], 429);
    }

    #[test]
    fn non_object_bodies_are_wrapped() {
        let mut payload = json!("rate limited");
        tag_error_payload(&mut payload, "http status 429");
        assert_eq!(payload[INGESTION_ERROR_FIELD], "http status 429");
        assert_eq!(payload["payload"], "rate limited");
    }
}
