use anyhow::{anyhow, Error};
use clap::Parser;
use slog::{o, Drain, Level, Logger};
use std::{env, path::PathBuf, time::Duration};
use time_tz::{timezones, Tz};
use windplot_core::{
    find_config_file, load_config, ConfigSource, DEFAULT_HOURS, DEFAULT_METAR_URL,
    DEFAULT_REFRESH_HOURS, DEFAULT_STATION, DEFAULT_TIMEZONE,
};

use crate::{ChartOptions, DisplayUnit, SpeedUnit};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "windplot - charts METAR wind speed, gusts and direction for a station"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $WINDPLOT_CONFIG, ./windplot.toml,
    /// $XDG_CONFIG_HOME/windplot/windplot.toml, /etc/windplot/windplot.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "WINDPLOT_LEVEL")]
    pub level: Option<String>,

    /// ICAO station identifier
    #[arg(short, long, env = "WINDPLOT_STATION")]
    pub station: Option<String>,

    /// Hours of reports to request when no dataset exists yet
    #[arg(long, env = "WINDPLOT_HOURS")]
    pub hours: Option<u32>,

    /// Hours of reports to request when extending an existing dataset
    #[arg(long, env = "WINDPLOT_REFRESH_HOURS")]
    pub refresh_hours: Option<u32>,

    /// IANA time zone used for report times and chart labels
    #[arg(short, long, env = "WINDPLOT_TIMEZONE")]
    pub timezone: Option<String>,

    /// Speed unit for the chart: mph, kt, kph, mps
    #[arg(short = 'u', long, env = "WINDPLOT_SPEED_UNIT")]
    pub speed_unit: Option<String>,

    /// Conversion factor from knots, overriding the unit's standard one
    #[arg(long, env = "WINDPLOT_SPEED_FACTOR")]
    pub speed_factor: Option<f64>,

    /// Chart width in inches
    #[arg(long, env = "WINDPLOT_CHART_WIDTH")]
    pub chart_width: Option<f64>,

    /// Chart height in inches
    #[arg(long, env = "WINDPLOT_CHART_HEIGHT")]
    pub chart_height: Option<f64>,

    /// Chart resolution in dots per inch
    #[arg(long, env = "WINDPLOT_DPI")]
    pub dpi: Option<u32>,

    /// Directory holding the dataset and chart
    #[arg(short, long, env = "WINDPLOT_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Dataset file, defaults to <station>_metar.parquet in the data dir
    #[arg(long, env = "WINDPLOT_DATASET_FILE")]
    pub dataset_file: Option<String>,

    /// Chart file, defaults to wind_plot.png in the data dir (.svg for SVG output)
    #[arg(long, env = "WINDPLOT_CHART_FILE")]
    pub chart_file: Option<String>,

    /// METAR text endpoint
    #[arg(short, long, env = "WINDPLOT_BASE_URL")]
    pub base_url: Option<String>,

    /// HTTP User-Agent header for METAR requests
    #[arg(long, env = "WINDPLOT_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Retries for transient HTTP failures
    #[arg(long, env = "WINDPLOT_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "WINDPLOT_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// Seconds between runs; runs once when unset
    #[arg(short, long, env = "WINDPLOT_INTERVAL")]
    pub interval: Option<u64>,
}

impl Cli {
    /// Get the effective configuration value with defaults
    pub fn station(&self) -> String {
        self.station
            .clone()
            .unwrap_or_else(|| DEFAULT_STATION.to_string())
            .to_uppercase()
    }

    pub fn hours(&self) -> u32 {
        self.hours.unwrap_or(DEFAULT_HOURS)
    }

    pub fn refresh_hours(&self) -> u32 {
        self.refresh_hours.unwrap_or(DEFAULT_REFRESH_HOURS)
    }

    pub fn timezone(&self) -> Result<&'static Tz, Error> {
        let name = self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE);
        timezones::get_by_name(name).ok_or_else(|| anyhow!("unknown time zone: {}", name))
    }

    pub fn display_unit(&self) -> Result<DisplayUnit, Error> {
        let unit: SpeedUnit = self
            .speed_unit
            .as_deref()
            .unwrap_or("mph")
            .parse()
            .map_err(|e: String| anyhow!(e))?;
        Ok(match self.speed_factor {
            Some(factor) if factor > 0.0 => DisplayUnit::with_factor(unit, factor),
            Some(factor) => return Err(anyhow!("speed factor must be positive: {}", factor)),
            None => DisplayUnit::new(unit),
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("./data"))
    }

    pub fn dataset_file(&self) -> PathBuf {
        match &self.dataset_file {
            Some(path) => PathBuf::from(path),
            None => self
                .data_dir()
                .join(format!("{}_metar.parquet", self.station().to_lowercase())),
        }
    }

    pub fn chart_file(&self) -> PathBuf {
        match &self.chart_file {
            Some(path) => PathBuf::from(path),
            None => self.data_dir().join("wind_plot.png"),
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_METAR_URL.to_string())
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("windplot/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(3)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.unwrap_or(20))
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn chart_options(&self) -> Result<ChartOptions, Error> {
        let width = self.chart_width.unwrap_or(4.0);
        let height = self.chart_height.unwrap_or(4.0);
        if width <= 0.0 || height <= 0.0 {
            return Err(anyhow!("chart size must be positive: {}x{}", width, height));
        }
        Ok(ChartOptions {
            station: self.station(),
            unit: self.display_unit()?,
            tz: self.timezone()?,
            width,
            height,
            dpi: self.dpi.unwrap_or(150).max(1),
            window_hours: self.hours(),
        })
    }

    /// Layer CLI/env values over values from a config file.
    pub fn merge(self, file_config: Cli) -> Cli {
        Cli {
            config: self.config,
            level: self.level.or(file_config.level),
            station: self.station.or(file_config.station),
            hours: self.hours.or(file_config.hours),
            refresh_hours: self.refresh_hours.or(file_config.refresh_hours),
            timezone: self.timezone.or(file_config.timezone),
            speed_unit: self.speed_unit.or(file_config.speed_unit),
            speed_factor: self.speed_factor.or(file_config.speed_factor),
            chart_width: self.chart_width.or(file_config.chart_width),
            chart_height: self.chart_height.or(file_config.chart_height),
            dpi: self.dpi.or(file_config.dpi),
            data_dir: self.data_dir.or(file_config.data_dir),
            dataset_file: self.dataset_file.or(file_config.dataset_file),
            chart_file: self.chart_file.or(file_config.chart_file),
            base_url: self.base_url.or(file_config.base_url),
            user_agent: self.user_agent.or(file_config.user_agent),
            max_retries: self.max_retries.or(file_config.max_retries),
            request_timeout: self.request_timeout.or(file_config.request_timeout),
            interval: self.interval.or(file_config.interval),
        }
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Result<Cli, Error> {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("WINDPLOT_CONFIG", "windplot.toml")
    };

    let file_config: Cli = load_config(&source)
        .map_err(|e| anyhow!("error loading config from {}: {}", source, e))?;

    // env vars are handled by clap
    Ok(cli_args.merge(file_config))
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let log_level = match cli.level.as_ref() {
        Some(level) => parse_level(level),
        None => parse_level(&env::var("RUST_LOG").unwrap_or_default()),
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(log_level).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}
