use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::env;

const API_KEY_SETTING: &str = "RAPIDAPI_KEY";
const API_HOST_SETTING: &str = "RAPIDAPI_HOST";
const BASE_URL_SETTING: &str = "COINHIST_BASE_URL";
const COIN_ID_SETTING: &str = "COINHIST_COIN_ID";
const EPOCH_SETTING: &str = "COINHIST_EPOCH";

const DEFAULT_API_HOST: &str = "coingecko.p.rapidapi.com";
const DEFAULT_COIN_ID: &str = "ethereum";

/// Earliest date the history endpoint serves data for the default coin.
fn default_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 8, 7).expect("valid epoch constant")
}

/// Everything the fetcher needs, resolved up front so it never touches
/// ambient process state and can be pointed at a stub in tests.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub api_key: String,
    pub api_host: String,
    pub base_url: String,
    pub coin_id: String,
    pub epoch: NaiveDate,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        let settings: HashMap<String, String> = env::vars().collect();
        Self::from_settings_map(&settings)
    }

    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self> {
        let api_key = require_setting(settings, API_KEY_SETTING)?.to_string();
        let api_host = optional_setting(settings, API_HOST_SETTING)
            .unwrap_or(DEFAULT_API_HOST)
            .to_string();
        let base_url = optional_setting(settings, BASE_URL_SETTING)
            .map(|value| value.to_string())
            .unwrap_or_else(|| format!("https://{}", api_host));
        let coin_id = optional_setting(settings, COIN_ID_SETTING)
            .unwrap_or(DEFAULT_COIN_ID)
            .to_string();
        let epoch = match optional_setting(settings, EPOCH_SETTING) {
            Some(raw) => parse_setting_date(EPOCH_SETTING, raw)?,
            None => default_epoch(),
        };

        Ok(Self {
            api_key,
            api_host,
            base_url: base_url.trim_end_matches('/').to_string(),
            coin_id,
            epoch,
        })
    }
}

fn require_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    optional_setting(settings, key).ok_or_else(|| anyhow!("Missing required setting {}", key))
}

fn optional_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_setting_date(key: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        anyhow!(
            "Setting {} must be a date in YYYY-MM-DD format (value: {})",
            key,
            raw
        )
    })
}
