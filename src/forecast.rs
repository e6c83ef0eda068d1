use anyhow::Result;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::lunar;
use crate::providers::{AlmanacSource, WeatherError, WeatherSource};
use crate::scoring::{combine, SubScores};
use crate::types::{round_to, AlmanacReading, DayInputs, ForecastResult, MoonReading, WeatherReading};

pub const DEFAULT_DAYS: u32 = 3;
pub const DEFAULT_CONCURRENCY: usize = 4;

/// A validated forecast query: one location, `days` consecutive dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub lat: f64,
    pub lon: f64,
    pub start_date: NaiveDate,
    pub days: u32,
}

impl ForecastRequest {
    /// Validate inputs before any provider is called. All problems are
    /// reported together.
    pub fn new(lat: f64, lon: f64, start_date: NaiveDate, days: u32) -> Result<Self> {
        let mut errors = Vec::new();

        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            errors.push(format!("latitude {} is outside -90..90", lat));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            errors.push(format!("longitude {} is outside -180..180", lon));
        }
        if days == 0 {
            errors.push("days must be at least 1".to_string());
        }

        if !errors.is_empty() {
            anyhow::bail!("{}", errors.join("; "));
        }

        Ok(Self {
            lat,
            lon,
            start_date,
            days,
        })
    }

    /// One `DayInputs` per requested date, in chronological order.
    pub fn day_inputs(&self) -> Vec<DayInputs> {
        self.start_date
            .iter_days()
            .take(self.days as usize)
            .map(|date| DayInputs::new(date, self.lat, self.lon))
            .collect()
    }
}

/// Parse an ISO calendar date ("2025-09-23").
pub fn parse_start_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid start date '{}' (expected YYYY-MM-DD): {}", s, e))
}

/// Score one day from readings that have already been gathered.
pub fn score_day(
    day: &DayInputs,
    moon: MoonReading,
    weather: WeatherReading,
    almanac: AlmanacReading,
) -> ForecastResult {
    let sub = SubScores::from_readings(&moon, &weather, &almanac);
    let combined = combine(sub.moon, sub.weather, sub.almanac);

    debug!(
        date = %day.date,
        moon = sub.moon,
        weather = sub.weather,
        almanac = ?sub.almanac,
        "sub-scores"
    );

    ForecastResult {
        date: day.date,
        moon,
        weather,
        almanac,
        bite_score: round_to(combined.total, 1),
        components: combined.components,
    }
}

/// Gather all readings for one day and score it.
pub async fn forecast_day(
    day: DayInputs,
    weather: &dyn WeatherSource,
    almanac: &dyn AlmanacSource,
) -> Result<ForecastResult, WeatherError> {
    let moon = lunar::moon_reading(day.date);
    let weather_reading = weather.fetch_weather(&day).await?;
    let almanac_reading = almanac.fetch_almanac(&day).await;

    let result = score_day(&day, moon, weather_reading, almanac_reading);
    info!(date = %result.date, score = result.bite_score, "scored day");
    Ok(result)
}

/// Forecast every day of the request.
///
/// Up to `concurrency` days are fetched at once; results come back in date
/// order. The first weather failure aborts the run.
pub async fn run_forecast(
    request: &ForecastRequest,
    weather: &dyn WeatherSource,
    almanac: &dyn AlmanacSource,
    concurrency: usize,
) -> Result<Vec<ForecastResult>, WeatherError> {
    info!(
        lat = request.lat,
        lon = request.lon,
        start = %request.start_date,
        days = request.days,
        "running forecast"
    );

    stream::iter(request.day_inputs())
        .map(|day| forecast_day(day, weather, almanac))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::NoAlmanac;
    use crate::types::Signal;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calm_day() -> WeatherReading {
        WeatherReading {
            temp_c: 18.0,
            wind_kph: 12.0,
            precip_mm: 0.0,
            cloud_pct: 30.0,
            pressure_hpa: None,
        }
    }

    struct FixedWeather {
        reading: WeatherReading,
        calls: AtomicUsize,
    }

    impl FixedWeather {
        fn new(reading: WeatherReading) -> Self {
            Self {
                reading,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WeatherSource for FixedWeather {
        async fn fetch_weather(&self, _day: &DayInputs) -> Result<WeatherReading, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reading.clone())
        }
    }

    /// Later dates answer faster, so completion order is reversed.
    struct SlowEarlyWeather {
        start: NaiveDate,
    }

    #[async_trait]
    impl WeatherSource for SlowEarlyWeather {
        async fn fetch_weather(&self, day: &DayInputs) -> Result<WeatherReading, WeatherError> {
            let offset = (day.date - self.start).num_days() as u64;
            tokio::time::sleep(Duration::from_millis(50 - offset * 10)).await;
            Ok(WeatherReading {
                temp_c: offset as f64,
                ..WeatherReading::default()
            })
        }
    }

    struct FailingWeather {
        fail_on: NaiveDate,
    }

    #[async_trait]
    impl WeatherSource for FailingWeather {
        async fn fetch_weather(&self, day: &DayInputs) -> Result<WeatherReading, WeatherError> {
            if day.date == self.fail_on {
                Err(WeatherError::Status {
                    status: 503,
                    url: "http://weather.test".to_string(),
                })
            } else {
                Ok(WeatherReading::default())
            }
        }
    }

    struct MapAlmanac(HashMap<NaiveDate, AlmanacReading>);

    #[async_trait]
    impl AlmanacSource for MapAlmanac {
        async fn fetch_almanac(&self, day: &DayInputs) -> AlmanacReading {
            self.0.get(&day.date).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn test_request_validation() {
        let start = date(2025, 9, 23);
        assert!(ForecastRequest::new(35.0, -97.0, start, 3).is_ok());
        assert!(ForecastRequest::new(90.0, 180.0, start, 1).is_ok());
        assert!(ForecastRequest::new(91.0, 0.0, start, 3).is_err());
        assert!(ForecastRequest::new(0.0, -181.0, start, 3).is_err());
        assert!(ForecastRequest::new(0.0, 0.0, start, 0).is_err());
        // The day count has no upper bound; the weather provider decides
        // which dates it can serve
        assert!(ForecastRequest::new(0.0, 0.0, start, 30).is_ok());
        assert!(ForecastRequest::new(f64::NAN, 0.0, start, 3).is_err());
    }

    #[test]
    fn test_request_reports_all_errors() {
        let err = ForecastRequest::new(100.0, 200.0, date(2025, 9, 23), 0).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("latitude"));
        assert!(msg.contains("longitude"));
        assert!(msg.contains("days"));
    }

    #[test]
    fn test_day_inputs_consecutive() {
        let request = ForecastRequest::new(1.0, 2.0, date(2025, 12, 30), 4).unwrap();
        let dates: Vec<_> = request.day_inputs().iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 12, 30), date(2025, 12, 31), date(2026, 1, 1), date(2026, 1, 2)]
        );
    }

    #[test]
    fn test_parse_start_date() {
        assert_eq!(parse_start_date("2025-09-23").unwrap(), date(2025, 9, 23));
        assert!(parse_start_date("09/23/2025").is_err());
        assert!(parse_start_date("2025-02-30").is_err());
    }

    #[test]
    fn test_end_to_end_scenario_without_almanac() {
        let day = DayInputs::new(date(2025, 9, 23), 35.4676, -97.5164);
        let moon = lunar::moon_reading(day.date);
        let moon_s = crate::scoring::score_moon(&moon);
        let weather_s = crate::scoring::score_weather(&calm_day());
        assert!((weather_s - 0.955).abs() < 1e-9);

        let result = score_day(&day, moon, calm_day(), AlmanacReading::absent());

        let expected = round_to(100.0 * (0.44 * moon_s + 0.56 * weather_s), 1);
        assert!((result.bite_score - expected).abs() < 1e-9);
        assert_eq!(result.components[&Signal::Weather], 53.5); // 53.48
        assert!(!result.components.contains_key(&Signal::Almanac));
        // each of the three roundings moves the values by at most 0.05
        assert!((result.components_total() - result.bite_score).abs() <= 0.15 + 1e-9);
    }

    #[test]
    fn test_score_day_with_almanac() {
        let day = DayInputs::new(date(2025, 9, 23), 35.0, -97.0);
        let almanac = AlmanacReading {
            rating: Some(0.7),
            notes: Some("Good".to_string()),
        };
        let result = score_day(&day, MoonReading::from_angle(180.0), calm_day(), almanac);
        // 100 * (0.35 * 1.0 + 0.45 * 0.955 + 0.20 * 0.7) = 91.975
        assert!((result.bite_score - 91.975).abs() <= 0.05 + 1e-9);
        assert_eq!(result.components[&Signal::Almanac], 14.0);
        assert_eq!(result.almanac.notes.as_deref(), Some("Good"));
    }

    #[tokio::test]
    async fn test_run_forecast_one_result_per_day() {
        let weather = FixedWeather::new(calm_day());
        let request = ForecastRequest::new(35.0, -97.0, date(2025, 9, 23), 3).unwrap();

        let results = run_forecast(&request, &weather, &NoAlmanac, 2).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(weather.calls.load(Ordering::SeqCst), 3);
        for result in &results {
            assert!((0.0..=100.0).contains(&result.bite_score));
            assert_eq!(result.weather, calm_day());
        }
    }

    #[tokio::test]
    async fn test_run_forecast_keeps_date_order() {
        let start = date(2025, 9, 23);
        let weather = SlowEarlyWeather { start };
        let request = ForecastRequest::new(35.0, -97.0, start, 5).unwrap();

        let results = run_forecast(&request, &weather, &NoAlmanac, 5).await.unwrap();

        let dates: Vec<_> = results.iter().map(|r| r.date).collect();
        let expected: Vec<_> = start.iter_days().take(5).collect();
        assert_eq!(dates, expected);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.weather.temp_c, i as f64);
        }
    }

    #[tokio::test]
    async fn test_weather_failure_is_fatal() {
        let start = date(2025, 9, 23);
        let weather = FailingWeather {
            fail_on: date(2025, 9, 24),
        };
        let request = ForecastRequest::new(35.0, -97.0, start, 3).unwrap();

        let err = run_forecast(&request, &weather, &NoAlmanac, 1).await.unwrap_err();
        assert!(matches!(err, WeatherError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_almanac_only_where_available() {
        let start = date(2025, 9, 23);
        let mut entries = HashMap::new();
        entries.insert(
            start,
            AlmanacReading {
                rating: Some(0.5),
                notes: None,
            },
        );
        let almanac = MapAlmanac(entries);
        let weather = FixedWeather::new(calm_day());
        let request = ForecastRequest::new(35.0, -97.0, start, 2).unwrap();

        let results = run_forecast(&request, &weather, &almanac, 1).await.unwrap();

        assert_eq!(results[0].components.len(), 3);
        assert_eq!(results[1].components.len(), 2);
        assert!(results[1].almanac.is_absent());
    }
}
