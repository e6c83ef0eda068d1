//! Moon phase from the calendar date alone.
//!
//! Uses the mean synodic month counted from a known new moon. Accuracy is
//! within about a day of the true phase, which is plenty for a daily score.

use chrono::{Datelike, NaiveDate};

use crate::types::MoonReading;

pub const SYNODIC_MONTH_DAYS: f64 = 29.530588853;

/// Day number (from CE) of 2000-01-06, the reference new moon.
const REFERENCE_NEW_MOON_DAY: i32 = 730_125;
/// The reference new moon fell at 18:14 UTC, expressed as a fraction of a day.
const REFERENCE_NEW_MOON_FRACTION: f64 = (18.0 * 60.0 + 14.0) / 1440.0;
/// Ages are evaluated at noon UTC of the requested date.
const EVALUATION_FRACTION: f64 = 0.5;

/// Ascending (threshold, name) rows. A phase takes the first row whose
/// threshold is >= the angle, so exact boundaries resolve to the lower name.
/// The 360 row only closes the table; normalized angles never reach it.
const PHASE_NAMES: [(f64, &str); 9] = [
    (0.0, "New Moon"),
    (45.0, "Waxing Crescent"),
    (90.0, "First Quarter"),
    (135.0, "Waxing Gibbous"),
    (180.0, "Full Moon"),
    (225.0, "Waning Gibbous"),
    (270.0, "Last Quarter"),
    (315.0, "Waning Crescent"),
    (360.0, "New Moon"),
];

/// Days since the most recent new moon, in [0, SYNODIC_MONTH_DAYS).
pub fn lunation_age(date: NaiveDate) -> f64 {
    let whole_days = (date.num_days_from_ce() - REFERENCE_NEW_MOON_DAY) as f64;
    let elapsed = whole_days + EVALUATION_FRACTION - REFERENCE_NEW_MOON_FRACTION;
    elapsed.rem_euclid(SYNODIC_MONTH_DAYS)
}

pub fn phase_angle(date: NaiveDate) -> f64 {
    normalize_angle(lunation_age(date) / SYNODIC_MONTH_DAYS * 360.0)
}

/// Fraction of the disc lit: 0 at new moon, 1 at full moon.
pub fn illumination(angle_deg: f64) -> f64 {
    0.5 * (1.0 - angle_deg.to_radians().cos())
}

pub fn phase_name(angle_deg: f64) -> &'static str {
    PHASE_NAMES
        .iter()
        .find(|(threshold, _)| angle_deg <= *threshold)
        .map(|(_, name)| *name)
        .unwrap_or("New Moon")
}

/// Look up a phase name as it appears in the table.
pub fn known_phase_name(name: &str) -> Option<&'static str> {
    PHASE_NAMES
        .iter()
        .map(|(_, known)| *known)
        .find(|known| *known == name)
}

pub fn moon_reading(date: NaiveDate) -> MoonReading {
    MoonReading::from_angle(phase_angle(date))
}

fn normalize_angle(angle_deg: f64) -> f64 {
    let wrapped = angle_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

impl MoonReading {
    /// Build a reading for an explicit phase angle (any real value, wrapped into [0, 360)).
    pub fn from_angle(angle_deg: f64) -> Self {
        let angle = normalize_angle(angle_deg);
        Self {
            phase_angle_deg: angle,
            illumination: illumination(angle),
            phase_name: phase_name(angle),
        }
    }
}
