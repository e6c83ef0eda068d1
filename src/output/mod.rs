pub mod formatter;
pub mod report;

pub use formatter::{
    format_json, format_results, format_score, format_table, format_tsv, should_use_colors,
    write_report, OutputFormat,
};
pub use report::{build_report, parse_report, AlmanacReport, DayReport, MoonReport, WeatherReport};
