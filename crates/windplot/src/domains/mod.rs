mod chart;
mod observations;

pub use chart::*;
pub use observations::*;
