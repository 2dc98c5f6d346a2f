mod units;
mod wind_chart;

pub use units::*;
pub use wind_chart::*;
