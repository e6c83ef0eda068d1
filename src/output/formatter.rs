use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Write};
use std::path::Path;

use super::report::build_report;
use crate::types::{ForecastResult, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON array, one object per day
    #[default]
    Json,
    /// Aligned human-readable table
    Table,
    /// Tab-separated values for scripting
    Tsv,
}

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

pub fn format_results(results: &[ForecastResult], format: OutputFormat, use_colors: bool) -> Result<String> {
    match format {
        OutputFormat::Json => format_json(results),
        OutputFormat::Table => Ok(format_table(results, use_colors)),
        OutputFormat::Tsv => Ok(format_tsv(results)),
    }
}

pub fn format_json(results: &[ForecastResult]) -> Result<String> {
    serde_json::to_string_pretty(&build_report(results)).context("Failed to serialize report")
}

/// Format a score with one decimal, right-aligned to 5 chars ("100.0")
pub fn format_score(score: f64) -> String {
    format!("{:>5.1}", score)
}

/// Format days as a table: date, score, moon phase, weather, almanac.
/// No headers (minimal format, like the default list view)
pub fn format_table(results: &[ForecastResult], use_colors: bool) -> String {
    if results.is_empty() {
        return "No forecast days.".to_string();
    }

    let phase_width = results
        .iter()
        .map(|r| r.moon.phase_name.len())
        .max()
        .unwrap_or(0);

    results
        .iter()
        .map(|r| {
            let date = r.date.format("%a %Y-%m-%d").to_string();
            let score = format_score(r.bite_score);
            let phase = format!("{:<width$}", r.moon.phase_name, width = phase_width);
            let weather = format!(
                "{:>5.1}C {:>5.1} km/h {:>5.2} mm {:>3.0}% cloud",
                r.weather.temp_c, r.weather.wind_kph, r.weather.precip_mm, r.weather.cloud_pct
            );
            let almanac = format_almanac(r);

            if use_colors {
                let score = if r.bite_score >= 70.0 {
                    score.green().bold().to_string()
                } else if r.bite_score >= 40.0 {
                    score.yellow().bold().to_string()
                } else {
                    score.red().bold().to_string()
                };
                format!(
                    "{}  {}  {}  {}  {}",
                    date,
                    score,
                    phase.cyan(),
                    weather,
                    almanac.dimmed()
                )
            } else {
                format!("{}  {}  {}  {}  {}", date, score, phase, weather, almanac)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format days as tab-separated values for scripting
/// Columns: date, score, moon, weather, almanac points, phase (no headers, no colors)
pub fn format_tsv(results: &[ForecastResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    results
        .iter()
        .map(|r| {
            let points = |signal: Signal| {
                r.components
                    .get(&signal)
                    .map(|p| format!("{:.1}", p))
                    .unwrap_or_default()
            };
            format!(
                "{}\t{:.1}\t{}\t{}\t{}\t{}",
                r.date.format("%Y-%m-%d"),
                r.bite_score,
                points(Signal::Moon),
                points(Signal::Weather),
                points(Signal::Almanac),
                r.moon.phase_name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_almanac(result: &ForecastResult) -> String {
    match (&result.almanac.rating, &result.almanac.notes) {
        (Some(rating), Some(notes)) => format!("almanac {:.2} ({})", rating, notes),
        (Some(rating), None) => format!("almanac {:.2}", rating),
        (None, Some(notes)) => format!("almanac n/a ({})", notes),
        (None, None) => "almanac n/a".to_string(),
    }
}

/// Write the report to a file atomically
///
/// Uses atomic-write-file so a failed run never leaves a half-written report.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    file.write_all(contents.as_bytes())
        .context("Failed to write report")?;
    file.write_all(b"\n").context("Failed to write report")?;

    file.commit()
        .with_context(|| format!("Failed to save report to {}", path.display()))?;

    Ok(())
}
