//! windplot core library
//!
//! Shared utilities for the windplot binary:
//! - Configuration loading (XDG-compliant)
//! - File system utilities
//! - Application defaults

mod config;
pub mod fs;

pub use config::{find_config_file, load_config, ConfigSource};
pub use fs::{ensure_dir_exists, path_exists, replace_file};

/// Application name used for XDG paths
pub const APP_NAME: &str = "windplot";

/// Station charted when none is configured
pub const DEFAULT_STATION: &str = "KDFW";

/// Trailing window requested when no dataset has been persisted yet
pub const DEFAULT_HOURS: u32 = 24;

/// Trailing window requested once a dataset exists
pub const DEFAULT_REFRESH_HOURS: u32 = 2;

/// Civil time zone used for report times and chart labels
pub const DEFAULT_TIMEZONE: &str = "America/Chicago";

/// aviationweather.gov raw METAR endpoint
pub const DEFAULT_METAR_URL: &str = "https://aviationweather.gov/api/data/metar";
