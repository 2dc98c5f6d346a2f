mod dataset;
mod download_observations;
mod metar_time;
mod parse_report;

pub use dataset::*;
pub use download_observations::*;
pub use metar_time::{
    resolve_day_time, resolve_report_time, resolve_year_month, DayTime,
    Error as TimeResolveError, MAX_UNAMBIGUOUS_WINDOW_HOURS, MONTH_ROLLOVER_MAX_DAY,
};
pub use parse_report::*;
