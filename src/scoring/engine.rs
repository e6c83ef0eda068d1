use super::bands::{CLOUD, PRECIP, WIND};
use crate::types::{clamp01, AlmanacReading, MoonReading, WeatherReading};

const MOON_PHASE_WEIGHT: f64 = 0.6;
const MOON_ILLUMINATION_WEIGHT: f64 = 0.4;

const WIND_WEIGHT: f64 = 0.35;
const CLOUD_WEIGHT: f64 = 0.25;
const PRECIP_WEIGHT: f64 = 0.20;
const TEMP_WEIGHT: f64 = 0.20;

const TEMP_FLOOR: f64 = 0.2;
const TEMP_COLD_LIMIT: f64 = -2.0;
const TEMP_COMFORT_LOW: f64 = 10.0;
const TEMP_COMFORT_HIGH: f64 = 24.0;
const TEMP_HOT_LIMIT: f64 = 32.0;

/// Per-factor weather scores, each in 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherBreakdown {
    pub wind: f64,
    pub cloud: f64,
    pub precip: f64,
    pub temp: f64,
    pub total: f64,
}

/// Normalized scores for one day before weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub moon: f64,
    pub weather: f64,
    pub almanac: Option<f64>,
}

impl SubScores {
    pub fn from_readings(
        moon: &MoonReading,
        weather: &WeatherReading,
        almanac: &AlmanacReading,
    ) -> Self {
        Self {
            moon: score_moon(moon),
            weather: score_weather(weather),
            almanac: score_almanac(almanac),
        }
    }
}

/// Phase term `|cos 2a|` blended with illumination, so brighter nights
/// rank higher among equal phase terms.
pub fn score_moon(moon: &MoonReading) -> f64 {
    let phase = (2.0 * moon.phase_angle_deg.to_radians()).cos().abs();
    clamp01(MOON_PHASE_WEIGHT * phase + MOON_ILLUMINATION_WEIGHT * moon.illumination)
}

pub fn score_weather(weather: &WeatherReading) -> f64 {
    weather_breakdown(weather).total
}

pub fn weather_breakdown(weather: &WeatherReading) -> WeatherBreakdown {
    let wind = WIND.lookup(weather.wind_kph);
    let cloud = CLOUD.lookup(weather.cloud_pct);
    let precip = PRECIP.lookup(weather.precip_mm);
    let temp = score_temp(weather.temp_c);

    let total = clamp01(
        WIND_WEIGHT * wind + CLOUD_WEIGHT * cloud + PRECIP_WEIGHT * precip + TEMP_WEIGHT * temp,
    );

    WeatherBreakdown {
        wind,
        cloud,
        precip,
        temp,
        total,
    }
}

/// 1.0 inside the 10..=24 C comfort window, ramping down to 0.2 at -2 C and
/// 32 C, and 0.2 beyond those.
pub fn score_temp(temp_c: f64) -> f64 {
    if temp_c < TEMP_COLD_LIMIT || temp_c > TEMP_HOT_LIMIT {
        TEMP_FLOOR
    } else if (TEMP_COMFORT_LOW..=TEMP_COMFORT_HIGH).contains(&temp_c) {
        1.0
    } else if temp_c < TEMP_COMFORT_LOW {
        let span = TEMP_COMFORT_LOW - TEMP_COLD_LIMIT;
        (TEMP_FLOOR + (temp_c - TEMP_COLD_LIMIT) / span * (1.0 - TEMP_FLOOR)).max(TEMP_FLOOR)
    } else {
        let span = TEMP_HOT_LIMIT - TEMP_COMFORT_HIGH;
        (TEMP_FLOOR + (TEMP_HOT_LIMIT - temp_c) / span * (1.0 - TEMP_FLOOR)).max(TEMP_FLOOR)
    }
}

/// Pass-through of the rating; an absent rating stays absent.
pub fn score_almanac(almanac: &AlmanacReading) -> Option<f64> {
    almanac.rating.map(clamp01)
}
