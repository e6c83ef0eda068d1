use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::cache::ResponseCache;
use super::WeatherSource;
use crate::types::{DayInputs, WeatherReading};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Local hours (inclusive) averaged into a day's reading.
pub const DAYLIGHT_START_HOUR: u32 = 6;
pub const DAYLIGHT_END_HOUR: u32 = 18;

const HOURLY_FIELDS: &str = "temperature_2m,precipitation,cloud_cover,pressure_msl,wind_speed_10m";
const MS_TO_KPH: f64 = 3.6;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather service returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("invalid weather response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid weather URL: {0}")]
    Url(String),
}

/// Hourly series from the Open-Meteo forecast API. Values may be null.
#[derive(Debug, Default, Deserialize)]
pub struct HourlyData {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub wind_speed_10m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub precipitation: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub cloud_cover: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub pressure_msl: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenMeteoResponse {
    #[serde(default)]
    pub hourly: HourlyData,
}

/// Weather readings from the Open-Meteo hourly forecast.
pub struct OpenMeteo {
    client: reqwest::Client,
    base_url: String,
    cache: Option<ResponseCache>,
}

impl OpenMeteo {
    pub fn new(base_url: &str, timeout: Duration, cache: Option<ResponseCache>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bite-forecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create weather HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            cache,
        })
    }

    async fn fetch_body(&self, day: &DayInputs) -> Result<String, WeatherError> {
        let url = request_url(&self.base_url, day)?;
        debug!(%url, "requesting weather");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Open-Meteo query for the local hours of a single day. Wind is requested in
/// m/s and converted when averaging.
pub fn request_url(base_url: &str, day: &DayInputs) -> Result<reqwest::Url, WeatherError> {
    let date = day.iso_date();
    reqwest::Url::parse_with_params(
        base_url,
        &[
            ("latitude", day.lat.to_string()),
            ("longitude", day.lon.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("wind_speed_unit", "ms".to_string()),
            ("timezone", "auto".to_string()),
            ("start_date", date.clone()),
            ("end_date", date),
        ],
    )
    .map_err(|e| WeatherError::Url(e.to_string()))
}

#[async_trait]
impl WeatherSource for OpenMeteo {
    async fn fetch_weather(&self, day: &DayInputs) -> Result<WeatherReading, WeatherError> {
        let key = cache_key(day);

        if let Some(body) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            debug!(date = %day.date, "weather cache hit");
            if let Ok(parsed) = serde_json::from_str::<OpenMeteoResponse>(&body) {
                return Ok(daylight_average(&parsed.hourly, &day.iso_date()));
            }
        }

        let body = self.fetch_body(day).await?;
        let parsed: OpenMeteoResponse = serde_json::from_str(&body)?;

        if let Some(cache) = &self.cache {
            // Ignore cache write errors
            let _ = cache.put(&key, &body);
        }

        Ok(daylight_average(&parsed.hourly, &day.iso_date()))
    }
}

fn cache_key(day: &DayInputs) -> String {
    format!("weather:{:.4}:{:.4}:{}", day.lat, day.lon, day.iso_date())
}

/// Average each hourly field over the daylight window of `date`.
///
/// Fields are averaged independently; a field with no usable values in the
/// window falls back to its default (pressure falls back to `None`).
pub fn daylight_average(hourly: &HourlyData, date: &str) -> WeatherReading {
    let window: Vec<usize> = hourly
        .time
        .iter()
        .enumerate()
        .filter(|(_, t)| in_daylight_window(t, date))
        .map(|(i, _)| i)
        .collect();

    let avg = |series: &Option<Vec<Option<f64>>>| -> Option<f64> {
        let series = series.as_ref()?;
        let values: Vec<f64> = window
            .iter()
            .filter_map(|&i| series.get(i).copied().flatten())
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };

    WeatherReading {
        temp_c: avg(&hourly.temperature_2m).unwrap_or(WeatherReading::DEFAULT_TEMP_C),
        wind_kph: avg(&hourly.wind_speed_10m)
            .map(|ms| ms * MS_TO_KPH)
            .unwrap_or(WeatherReading::DEFAULT_WIND_KPH),
        precip_mm: avg(&hourly.precipitation).unwrap_or(WeatherReading::DEFAULT_PRECIP_MM),
        cloud_pct: avg(&hourly.cloud_cover).unwrap_or(WeatherReading::DEFAULT_CLOUD_PCT),
        pressure_hpa: avg(&hourly.pressure_msl),
    }
}

/// True when a local "YYYY-MM-DDTHH:MM" timestamp is on `date` within the
/// daylight hours. Timestamps whose hour can't be read are kept.
fn in_daylight_window(timestamp: &str, date: &str) -> bool {
    if !timestamp.starts_with(date) {
        return false;
    }
    let hour = timestamp
        .split_once('T')
        .and_then(|(_, time)| time.split(':').next())
        .and_then(|h| h.parse::<u32>().ok());
    match hour {
        Some(h) => (DAYLIGHT_START_HOUR..=DAYLIGHT_END_HOUR).contains(&h),
        None => true,
    }
}
