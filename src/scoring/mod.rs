pub mod bands;
pub mod combine;
pub mod engine;

pub use bands::{BandTable, Bound};
pub use combine::{combine, Combined, Weights};
pub use engine::{
    score_almanac, score_moon, score_temp, score_weather, weather_breakdown, SubScores,
    WeatherBreakdown,
};
