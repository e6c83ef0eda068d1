use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The date and location a single forecast day is computed for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayInputs {
    pub date: NaiveDate,
    pub lat: f64,
    pub lon: f64,
}

impl DayInputs {
    pub fn new(date: NaiveDate, lat: f64, lon: f64) -> Self {
        Self { date, lat, lon }
    }

    /// ISO calendar date ("2025-09-23")
    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoonReading {
    pub phase_angle_deg: f64,   // [0, 360)
    pub illumination: f64,      // 0..1
    pub phase_name: &'static str,
}

/// Daylight-window averages for one day. Fields the provider had no data for
/// carry their defaults; pressure stays `None` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temp_c: f64,
    pub wind_kph: f64,
    pub precip_mm: f64,
    pub cloud_pct: f64,
    pub pressure_hpa: Option<f64>,
}

impl WeatherReading {
    pub const DEFAULT_TEMP_C: f64 = 20.0;
    pub const DEFAULT_WIND_KPH: f64 = 10.0;
    pub const DEFAULT_PRECIP_MM: f64 = 0.0;
    pub const DEFAULT_CLOUD_PCT: f64 = 50.0;

    pub fn temp_f(&self) -> f64 {
        self.temp_c * 9.0 / 5.0 + 32.0
    }
}

impl Default for WeatherReading {
    fn default() -> Self {
        Self {
            temp_c: Self::DEFAULT_TEMP_C,
            wind_kph: Self::DEFAULT_WIND_KPH,
            precip_mm: Self::DEFAULT_PRECIP_MM,
            cloud_pct: Self::DEFAULT_CLOUD_PCT,
            pressure_hpa: None,
        }
    }
}

/// Almanac data for one day. A missing rating is a normal state: the
/// combiner switches to its two-signal weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlmanacReading {
    pub rating: Option<f64>,
    pub notes: Option<String>,
}

impl AlmanacReading {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.rating.is_none()
    }
}

/// Named input signal of the bite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Moon,
    Weather,
    Almanac,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Moon => "moon",
            Signal::Weather => "weather",
            Signal::Almanac => "almanac",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point contributions per signal, rounded to one decimal.
pub type Components = BTreeMap<Signal, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub date: NaiveDate,
    pub moon: MoonReading,
    pub weather: WeatherReading,
    pub almanac: AlmanacReading,
    pub bite_score: f64, // 0..100, one decimal
    pub components: Components,
}

impl ForecastResult {
    pub fn components_total(&self) -> f64 {
        self.components.values().sum()
    }
}

/// Round to `places` decimal places (half away from zero).
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weather_reading() {
        let reading = WeatherReading::default();
        assert_eq!(reading.temp_c, 20.0);
        assert_eq!(reading.wind_kph, 10.0);
        assert_eq!(reading.precip_mm, 0.0);
        assert_eq!(reading.cloud_pct, 50.0);
        assert!(reading.pressure_hpa.is_none());
    }

    #[test]
    fn test_temp_f_conversion() {
        let reading = WeatherReading {
            temp_c: 100.0,
            ..WeatherReading::default()
        };
        assert!((reading.temp_f() - 212.0).abs() < 1e-9);
    }

    #[test]
    fn test_iso_date() {
        let day = DayInputs::new(NaiveDate::from_ymd_opt(2025, 9, 3).unwrap(), 1.0, 2.0);
        assert_eq!(day.iso_date(), "2025-09-03");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(12.35, 0), 12.0);
        assert_eq!(round_to(0.12345, 3), 0.123);
    }

    #[test]
    fn test_signal_serializes_lowercase() {
        let json = serde_json::to_string(&Signal::Almanac).unwrap();
        assert_eq!(json, "\"almanac\"");
    }

    #[test]
    fn test_absent_almanac() {
        assert!(AlmanacReading::absent().is_absent());
        let with_notes = AlmanacReading {
            rating: None,
            notes: Some("Fair".to_string()),
        };
        assert!(with_notes.is_absent());
    }
}
