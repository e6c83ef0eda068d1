use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::providers::{almanac, cache, weather, AlmanacMode};

/// Settings file contents. Every section is optional.
///
/// Example YAML:
/// ```yaml
/// location: { lat: 35.4676, lon: -97.5164 }
/// almanac:
///   mode: file
///   file: ./almanac.json
///   timeout: 15s
/// weather:
///   timeout: 20s
/// cache:
///   ttl: 1h
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub location: Option<LocationConfig>,

    #[serde(default)]
    pub almanac: AlmanacConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Default coordinates used when --lat/--lon are not given.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LocationConfig {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AlmanacConfig {
    /// "api", "file" or "none"; anything else disables the almanac
    #[serde(default)]
    pub mode: Option<String>,

    /// Path to the local almanac JSON used in file mode
    #[serde(default)]
    pub file: Option<String>,

    /// Overridden by OFA_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    /// URL with {lat}, {lon}, {date} and {key} placeholders. Overridden by OFA_API_URL
    #[serde(default)]
    pub url_template: Option<String>,

    /// Request timeout, e.g. "15s"
    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeatherConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout, e.g. "20s"
    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: Option<bool>,

    /// How long cached weather responses stay valid, e.g. "1h"
    #[serde(default)]
    pub ttl: Option<String>,
}

impl AlmanacConfig {
    pub fn mode(&self) -> Option<AlmanacMode> {
        self.mode.as_deref().map(AlmanacMode::parse_lenient)
    }

    pub fn timeout(&self) -> Duration {
        parse_duration_or(self.timeout.as_deref(), almanac::DEFAULT_TIMEOUT)
    }

    /// API key, preferring the environment over the file
    pub fn resolved_api_key(&self) -> Option<String> {
        env_value(almanac::ENV_API_KEY).or_else(|| self.api_key.clone())
    }

    /// URL template, preferring the environment over the file
    pub fn resolved_url_template(&self) -> Option<String> {
        env_value(almanac::ENV_API_URL).or_else(|| self.url_template.clone())
    }
}

impl WeatherConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(weather::DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        parse_duration_or(self.timeout.as_deref(), weather::DEFAULT_TIMEOUT)
    }
}

impl CacheConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn ttl(&self) -> Duration {
        parse_duration_or(self.ttl.as_deref(), cache::DEFAULT_TTL)
    }
}

/// Invalid durations are reported by `validate_config`; here they fall back.
fn parse_duration_or(value: Option<&str>, default: Duration) -> Duration {
    value
        .and_then(|v| humantime::parse_duration(v.trim()).ok())
        .unwrap_or(default)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_parse() {
        let config: Config = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.location.is_none());
        assert!(config.almanac.mode().is_none());
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
location:
  lat: 35.4676
  lon: -97.5164
almanac:
  mode: file
  file: ./my-almanac.json
  url_template: "https://almanac.example/v1?lat={lat}&lon={lon}&date={date}&apikey={key}"
  timeout: 5s
weather:
  base_url: https://api.open-meteo.com/v1/forecast
  timeout: 30s
cache:
  enabled: false
  ttl: 2h
"#;
        let config: Config = serde_saphyr::from_str(yaml).unwrap();
        let location = config.location.unwrap();
        assert_eq!(location.lat, 35.4676);
        assert_eq!(location.lon, -97.5164);
        assert_eq!(config.almanac.mode(), Some(AlmanacMode::File));
        assert_eq!(config.almanac.file.as_deref(), Some("./my-almanac.json"));
        assert_eq!(config.almanac.timeout(), Duration::from_secs(5));
        assert_eq!(config.weather.timeout(), Duration::from_secs(30));
        assert!(!config.cache.enabled());
        assert_eq!(config.cache.ttl(), Duration::from_secs(7200));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.weather.base_url(), weather::DEFAULT_BASE_URL);
        assert_eq!(config.weather.timeout(), Duration::from_secs(20));
        assert_eq!(config.almanac.timeout(), Duration::from_secs(15));
        assert!(config.cache.enabled());
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_unknown_mode_disables_almanac() {
        let config: Config = serde_saphyr::from_str("almanac:\n  mode: farmers\n").unwrap();
        assert_eq!(config.almanac.mode(), Some(AlmanacMode::None));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<Config, _> = serde_saphyr::from_str("weather:\n  units: metric\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config {
            location: Some(LocationConfig { lat: 1.5, lon: 2.5 }),
            cache: CacheConfig {
                enabled: Some(false),
                ttl: Some("30m".to_string()),
            },
            ..Config::default()
        };
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed: Config = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }
}
