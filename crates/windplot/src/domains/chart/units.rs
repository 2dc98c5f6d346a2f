use std::fmt;
use std::str::FromStr;

/// Units wind speed can be charted in. Reports are always in knots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedUnit {
    Knots,
    MilesPerHour,
    KilometersPerHour,
    MetersPerSecond,
}

impl SpeedUnit {
    /// Multiplier from knots
    pub fn knots_factor(&self) -> f64 {
        match self {
            SpeedUnit::Knots => 1.0,
            SpeedUnit::MilesPerHour => 1.15078,
            SpeedUnit::KilometersPerHour => 1.852,
            SpeedUnit::MetersPerSecond => 0.514444,
        }
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpeedUnit::Knots => "kt",
            SpeedUnit::MilesPerHour => "mph",
            SpeedUnit::KilometersPerHour => "km/h",
            SpeedUnit::MetersPerSecond => "m/s",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for SpeedUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kt" | "kts" | "knots" => Ok(SpeedUnit::Knots),
            "mph" => Ok(SpeedUnit::MilesPerHour),
            "kph" | "km/h" | "kmh" => Ok(SpeedUnit::KilometersPerHour),
            "mps" | "m/s" => Ok(SpeedUnit::MetersPerSecond),
            other => Err(format!("unknown speed unit: {}", other)),
        }
    }
}

/// A speed unit together with the factor used to convert knots into it.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayUnit {
    pub unit: SpeedUnit,
    pub factor: f64,
}

impl DisplayUnit {
    pub fn new(unit: SpeedUnit) -> Self {
        DisplayUnit {
            unit,
            factor: unit.knots_factor(),
        }
    }

    pub fn with_factor(unit: SpeedUnit, factor: f64) -> Self {
        DisplayUnit { unit, factor }
    }

    pub fn convert(&self, knots: u32) -> f64 {
        f64::from(knots) * self.factor
    }
}
