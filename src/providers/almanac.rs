use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use super::AlmanacSource;
use crate::types::{clamp01, AlmanacReading, DayInputs};

/// Environment variables for API mode; they take precedence over the config file.
pub const ENV_API_KEY: &str = "OFA_API_KEY";
pub const ENV_API_URL: &str = "OFA_API_URL";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_FILE: &str = "./almanac.json";

/// Placeholders a URL template may contain.
pub const PLACEHOLDERS: [&str; 4] = ["{lat}", "{lon}", "{date}", "{key}"];

/// Almanac ratings from a user-supplied HTTP endpoint.
///
/// Without both an API key and a URL template every lookup is absent.
pub struct AlmanacApi {
    client: reqwest::Client,
    api_key: Option<String>,
    url_template: Option<String>,
}

impl AlmanacApi {
    pub fn new(
        api_key: Option<String>,
        url_template: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bite-forecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create almanac HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            url_template: url_template.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.url_template.is_some()
    }

    async fn fetch_payload(&self, url: &str) -> anyhow::Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach almanac API")?
            .error_for_status()
            .context("Almanac API returned an error status")?;

        response
            .json::<Value>()
            .await
            .context("Failed to parse almanac JSON")
    }
}

#[async_trait]
impl AlmanacSource for AlmanacApi {
    async fn fetch_almanac(&self, day: &DayInputs) -> AlmanacReading {
        let (Some(key), Some(template)) = (&self.api_key, &self.url_template) else {
            debug!("almanac API not configured");
            return AlmanacReading::absent();
        };

        let url = render_url(template, day, key);
        match self.fetch_payload(&url).await {
            Ok(payload) => parse_api_payload(&payload),
            Err(e) => {
                warn!(date = %day.date, "almanac lookup failed: {:#}", e);
                AlmanacReading::absent()
            }
        }
    }
}

/// Fill `{lat}`, `{lon}`, `{date}` and `{key}` in a URL template.
pub fn render_url(template: &str, day: &DayInputs, key: &str) -> String {
    template
        .replace("{lat}", &day.lat.to_string())
        .replace("{lon}", &day.lon.to_string())
        .replace("{date}", &day.iso_date())
        .replace("{key}", key)
}

/// Convert a 1..5 star rating to 0..1.
pub fn stars_to_rating(stars: f64) -> f64 {
    clamp01((stars - 1.0) / 4.0)
}

/// Interpret an API response body.
///
/// `rating` (0..1) wins over `stars` (1..5). Notes come from `notes`, then
/// `summary`. A rating field that is present but not numeric makes the whole
/// reading absent.
pub fn parse_api_payload(payload: &Value) -> AlmanacReading {
    let notes = text_field(payload, "notes").or_else(|| text_field(payload, "summary"));

    let rating = match (present(payload, "rating"), present(payload, "stars")) {
        (Some(rating), _) => match number(rating) {
            Some(r) => Some(r),
            None => return AlmanacReading::absent(),
        },
        (None, Some(stars)) => match number(stars) {
            Some(s) => Some(stars_to_rating(s)),
            None => return AlmanacReading::absent(),
        },
        (None, None) => None,
    };

    AlmanacReading { rating, notes }
}

/// Almanac ratings from a local JSON file keyed by ISO date.
pub struct AlmanacFile {
    path: PathBuf,
}

impl AlmanacFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AlmanacSource for AlmanacFile {
    async fn fetch_almanac(&self, day: &DayInputs) -> AlmanacReading {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => lookup_file_entry(&contents, &day.iso_date()),
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read almanac file: {}", e);
                AlmanacReading::absent()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileEntry {
    /// Number or numeric string, same rule as the API payload
    #[serde(default)]
    rating: Option<Value>,
    #[serde(default)]
    notes: Option<String>,
}

/// Find the entry for `date` in an almanac file's contents.
///
/// Unparseable files, a missing date or a malformed entry give an absent
/// reading. Notes survive a missing rating.
pub fn lookup_file_entry(contents: &str, date: &str) -> AlmanacReading {
    let entries: HashMap<String, Value> = match serde_json::from_str(contents) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("invalid almanac file: {}", e);
            return AlmanacReading::absent();
        }
    };

    let Some(entry) = entries.get(date) else {
        debug!(date, "no almanac entry");
        return AlmanacReading::absent();
    };

    let entry = match FileEntry::deserialize(entry) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(date, "invalid almanac entry: {}", e);
            return AlmanacReading::absent();
        }
    };

    let rating = match entry.rating {
        Some(value) => match number(&value) {
            Some(r) => Some(r),
            None => {
                warn!(date, %value, "almanac rating is not a number");
                return AlmanacReading::absent();
            }
        },
        None => None,
    };

    AlmanacReading {
        rating,
        notes: entry.notes,
    }
}

/// Almanac disabled: every day is absent.
pub struct NoAlmanac;

#[async_trait]
impl AlmanacSource for NoAlmanac {
    async fn fetch_almanac(&self, _day: &DayInputs) -> AlmanacReading {
        AlmanacReading::absent()
    }
}

fn present<'a>(payload: &'a Value, field: &str) -> Option<&'a Value> {
    payload.get(field).filter(|v| !v.is_null())
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_field(payload: &Value, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
