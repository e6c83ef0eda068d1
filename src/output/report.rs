use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::lunar;
use crate::types::{
    round_to, AlmanacReading, Components, ForecastResult, MoonReading, WeatherReading,
};

/// One day of the machine-readable report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub date: String,
    pub bite_score_0_100: f64,
    pub components: Components,
    pub moon: MoonReport,
    pub weather: WeatherReport,
    pub almanac: AlmanacReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonReport {
    pub phase_angle_deg: f64,
    pub illumination_0_1: f64,
    pub phase_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temp_c: f64,
    pub temp_f: f64,
    pub wind_kph: f64,
    pub precip_mm: f64,
    pub cloud_pct: i64,
    pub pressure_hpa: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlmanacReport {
    pub rating_0_1: Option<f64>,
    pub notes: Option<String>,
}

impl From<&ForecastResult> for DayReport {
    fn from(result: &ForecastResult) -> Self {
        let weather = &result.weather;
        Self {
            date: result.date.format("%Y-%m-%d").to_string(),
            bite_score_0_100: round_to(result.bite_score, 1),
            components: result.components.clone(),
            moon: MoonReport {
                phase_angle_deg: round_to(result.moon.phase_angle_deg, 2),
                illumination_0_1: round_to(result.moon.illumination, 3),
                phase_name: result.moon.phase_name.to_string(),
            },
            weather: WeatherReport {
                temp_c: round_to(weather.temp_c, 1),
                temp_f: round_to(weather.temp_f(), 1),
                wind_kph: round_to(weather.wind_kph, 1),
                precip_mm: round_to(weather.precip_mm, 2),
                cloud_pct: weather.cloud_pct.round() as i64,
                pressure_hpa: weather.pressure_hpa.map(|p| round_to(p, 1)),
            },
            almanac: AlmanacReport {
                rating_0_1: result.almanac.rating,
                notes: result.almanac.notes.clone(),
            },
        }
    }
}

impl DayReport {
    /// Rebuild a `ForecastResult` from a parsed report day. Values carry the
    /// report's rounding.
    pub fn into_result(self) -> Result<ForecastResult> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .with_context(|| format!("invalid report date '{}'", self.date))?;
        // Keep the reported name: the rounded angle can fall on the other
        // side of a table boundary.
        let phase_name = lunar::known_phase_name(&self.moon.phase_name)
            .with_context(|| format!("unknown phase name '{}'", self.moon.phase_name))?;

        Ok(ForecastResult {
            date,
            moon: MoonReading {
                phase_angle_deg: self.moon.phase_angle_deg,
                illumination: self.moon.illumination_0_1,
                phase_name,
            },
            weather: WeatherReading {
                temp_c: self.weather.temp_c,
                wind_kph: self.weather.wind_kph,
                precip_mm: self.weather.precip_mm,
                cloud_pct: self.weather.cloud_pct as f64,
                pressure_hpa: self.weather.pressure_hpa,
            },
            almanac: AlmanacReading {
                rating: self.almanac.rating_0_1,
                notes: self.almanac.notes,
            },
            bite_score: self.bite_score_0_100,
            components: self.components,
        })
    }
}

pub fn build_report(results: &[ForecastResult]) -> Vec<DayReport> {
    results.iter().map(DayReport::from).collect()
}

/// Parse a JSON report produced by `format_json`.
pub fn parse_report(json: &str) -> Result<Vec<ForecastResult>> {
    let days: Vec<DayReport> = serde_json::from_str(json).context("Failed to parse report JSON")?;
    days.into_iter().map(DayReport::into_result).collect()
}
