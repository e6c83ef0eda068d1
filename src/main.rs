use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bite_forecast::config::{AlmanacConfig, Config};
use bite_forecast::forecast::{self, ForecastRequest};
use bite_forecast::output::{self, OutputFormat};
use bite_forecast::providers::{
    almanac, cache, AlmanacApi, AlmanacFile, AlmanacMode, AlmanacSource, NoAlmanac, OpenMeteo,
};

const EXIT_SUCCESS: i32 = 0;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Parser, Debug)]
#[command(name = "bite-forecast")]
#[command(about = "Daily fishing bite score from moon phase, weather and almanac", long_about = None)]
#[command(version)]
struct Cli {
    /// Latitude in degrees (defaults to location.lat from the config file)
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude in degrees (defaults to location.lon from the config file)
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Number of consecutive days to forecast
    #[arg(long, default_value_t = forecast::DEFAULT_DAYS)]
    days: u32,

    /// First day to forecast, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    start_date: Option<String>,

    /// Almanac source: api, file or none. Unknown values disable the almanac
    #[arg(long)]
    almanac_mode: Option<String>,

    /// Almanac JSON file used in file mode
    #[arg(long)]
    almanac_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to config file (defaults to ~/.config/bite-forecast/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the weather response cache
    #[arg(long)]
    no_cache: bool,

    /// Remove cached weather responses before running
    #[arg(long)]
    clear_cache: bool,

    /// Days fetched in parallel
    #[arg(long, default_value_t = forecast::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "bite_forecast=debug,warn" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn exit_config_error(message: impl std::fmt::Display) -> ! {
    eprintln!("Config error: {}", message);
    std::process::exit(EXIT_CONFIG);
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let start_time = Instant::now();

    let config = match bite_forecast::config::load_config(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => exit_config_error(format!("{:#}", e)),
    };

    if let Err(errors) = bite_forecast::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let request = match build_request(&cli, &config) {
        Ok(r) => r,
        Err(e) => exit_config_error(format!("{:#}", e)),
    };

    let cache_path = cache::get_cache_path();
    if cli.clear_cache {
        if let Err(e) = cache::clear_cache(&cache_path) {
            tracing::warn!("{:#}", e);
        }
    }
    let response_cache = (config.cache.enabled() && !cli.no_cache)
        .then(|| cache::ResponseCache::new(cache_path, config.cache.ttl()));

    let weather = match OpenMeteo::new(
        config.weather.base_url(),
        config.weather.timeout(),
        response_cache,
    ) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Failed to create weather client: {:#}", e);
            std::process::exit(EXIT_NETWORK);
        }
    };

    let mode = cli
        .almanac_mode
        .as_deref()
        .map(AlmanacMode::parse_lenient)
        .or_else(|| config.almanac.mode())
        .unwrap_or_default();
    let almanac_source = match build_almanac(mode, cli.almanac_file.clone(), &config.almanac) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Failed to create almanac client: {:#}", e);
            std::process::exit(EXIT_NETWORK);
        }
    };
    tracing::debug!(%mode, "almanac source selected");

    let results = match forecast::run_forecast(
        &request,
        &weather,
        almanac_source.as_ref(),
        cli.concurrency,
    )
    .await
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Weather retrieval failed: {}", e);
            std::process::exit(EXIT_NETWORK);
        }
    };

    let use_colors = cli.output.is_none() && output::should_use_colors();
    let rendered = match output::format_results(&results, cli.format, use_colors) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = output::write_report(path, &rendered) {
                eprintln!("{:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{}", rendered),
    }

    tracing::info!(days = results.len(), elapsed = ?start_time.elapsed(), "done");
    std::process::exit(EXIT_SUCCESS);
}

/// Resolve coordinates and dates from flags, falling back to the config file.
fn build_request(cli: &Cli, config: &Config) -> anyhow::Result<ForecastRequest> {
    let location = config.location;
    let lat = cli.lat.or(location.map(|l| l.lat));
    let lon = cli.lon.or(location.map(|l| l.lon));
    let (Some(lat), Some(lon)) = (lat, lon) else {
        anyhow::bail!("--lat and --lon are required (or set location in the config file)");
    };

    let start_date = match cli.start_date.as_deref() {
        Some(s) => forecast::parse_start_date(s)?,
        None => chrono::Local::now().date_naive(),
    };

    ForecastRequest::new(lat, lon, start_date, cli.days)
}

fn build_almanac(
    mode: AlmanacMode,
    file: Option<PathBuf>,
    config: &AlmanacConfig,
) -> anyhow::Result<Box<dyn AlmanacSource>> {
    let source: Box<dyn AlmanacSource> = match mode {
        AlmanacMode::Api => {
            let api = AlmanacApi::new(
                config.resolved_api_key(),
                config.resolved_url_template(),
                config.timeout(),
            )?;
            if !api.is_configured() {
                tracing::info!(
                    "almanac API needs {} and {}; almanac disabled",
                    almanac::ENV_API_KEY,
                    almanac::ENV_API_URL
                );
            }
            Box::new(api)
        }
        AlmanacMode::File => {
            let path = file
                .or_else(|| config.file.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(almanac::DEFAULT_FILE));
            Box::new(AlmanacFile::new(path))
        }
        AlmanacMode::None => Box::new(NoAlmanac),
    };
    Ok(source)
}
