use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static WIND_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<dir>\d{3}|VRB)(?P<speed>\d{2})(?:G(?P<gust>\d{2}))?KT")
        .expect("wind group pattern is valid")
});

static TIME_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<code>\d{6})Z").expect("time group pattern is valid")
});

/// Where the wind is blowing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindDirection {
    /// Degrees true, normalized into `0..360`
    Degrees(u16),
    /// `VRB` in the report
    Variable,
}

impl WindDirection {
    /// Bearing the wind is blowing toward, in degrees. `None` for variable winds.
    pub fn toward_degrees(&self) -> Option<f64> {
        match self {
            WindDirection::Degrees(from) => Some(f64::from((from + 180) % 360)),
            WindDirection::Variable => None,
        }
    }
}

impl fmt::Display for WindDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindDirection::Degrees(deg) => write!(f, "{:03}", deg),
            WindDirection::Variable => write!(f, "VRB"),
        }
    }
}

impl FromStr for WindDirection {
    type Err = String;

    /// METAR reports north as `360`; it is stored as `0`. Values above 360
    /// are not directions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "VRB" {
            return Ok(WindDirection::Variable);
        }
        match s.parse::<u16>() {
            Ok(deg) if deg < 360 => Ok(WindDirection::Degrees(deg)),
            Ok(360) => Ok(WindDirection::Degrees(0)),
            _ => Err(format!("invalid wind direction: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wind {
    pub direction: Option<WindDirection>,
    /// knots
    pub speed: u32,
    /// knots
    pub gust: Option<u32>,
}

/// The two groups pulled out of a raw report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReport<'a> {
    pub time_code: &'a str,
    pub wind: Option<Wind>,
}

/// First wind group in the line, if any.
pub fn parse_wind(line: &str) -> Option<Wind> {
    let caps = WIND_GROUP.captures(line)?;
    let speed = caps["speed"].parse::<u32>().ok()?;
    Some(Wind {
        direction: caps["dir"].parse().ok(),
        speed,
        gust: caps.name("gust").and_then(|g| g.as_str().parse().ok()),
    })
}

/// First `DDHHMMZ` group in the line, without the `Z`.
pub fn parse_time_code(line: &str) -> Option<&str> {
    TIME_GROUP
        .captures(line)
        .and_then(|caps| caps.name("code"))
        .map(|m| m.as_str())
}

/// Extract the wind and time groups of a report line.
///
/// A line without a time group can't be dated and yields `None`. A line with
/// a time group but no wind group still parses, with `wind` empty.
pub fn parse_report(line: &str) -> Option<ParsedReport<'_>> {
    let time_code = parse_time_code(line)?;
    Some(ParsedReport {
        time_code,
        wind: parse_wind(line),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wind_with_gust() {
        let line = "KDFW 021853Z 18012G20KT 10SM FEW250 27/14 A2992";
        let parsed = parse_report(line).unwrap();
        assert_eq!(parsed.time_code, "021853");
        assert_eq!(
            parsed.wind,
            Some(Wind {
                direction: Some(WindDirection::Degrees(180)),
                speed: 12,
                gust: Some(20),
            })
        );
    }

    #[test]
    fn parses_wind_without_gust() {
        let wind = parse_wind("KDFW 021753Z 17009KT 10SM").unwrap();
        assert_eq!(wind.direction, Some(WindDirection::Degrees(170)));
        assert_eq!(wind.speed, 9);
        assert_eq!(wind.gust, None);
    }

    #[test]
    fn parses_variable_wind() {
        let wind = parse_wind("KDFW 020553Z VRB03KT 10SM CLR").unwrap();
        assert_eq!(wind.direction, Some(WindDirection::Variable));
        assert_eq!(wind.speed, 3);
        assert_eq!(wind.direction.unwrap().toward_degrees(), None);
    }

    #[test]
    fn extracts_every_direction_speed_and_gust_exactly() {
        for dir in (0..360).step_by(10) {
            for (speed, gust) in [(0, None), (7, None), (15, Some(25)), (99, Some(99))] {
                let token = match gust {
                    Some(g) => format!("{:03}{:02}G{:02}KT", dir, speed, g),
                    None => format!("{:03}{:02}KT", dir, speed),
                };
                let line = format!("KDFW 011253Z {} 10SM SCT045", token);
                let wind = parse_wind(&line).unwrap();
                let expected = Some(WindDirection::Degrees(dir));
                assert_eq!(wind.direction, expected, "{}", token);
                assert_eq!(wind.speed, speed, "{}", token);
                assert_eq!(wind.gust, gust, "{}", token);
            }
        }
    }

    #[test]
    fn north_is_normalized_to_zero() {
        let wind = parse_wind("KDFW 011253Z 36010KT").unwrap();
        assert_eq!(wind.direction, Some(WindDirection::Degrees(0)));
        assert_eq!(wind.direction.unwrap().to_string(), "000");
    }

    #[test]
    fn impossible_direction_keeps_speed() {
        let wind = parse_wind("KDFW 011253Z 40010KT").unwrap();
        assert_eq!(wind.direction, None);
        assert_eq!(wind.speed, 10);
    }

    #[test]
    fn first_match_wins() {
        let line = "KDFW 021853Z 18012KT RMK PK WND 20025/1830 031200Z 09005KT";
        let parsed = parse_report(line).unwrap();
        assert_eq!(parsed.time_code, "021853");
        assert_eq!(parsed.wind.unwrap().speed, 12);
    }

    #[test]
    fn missing_wind_is_not_an_error() {
        let parsed = parse_report("KDFW 021853Z AUTO 10SM CLR").unwrap();
        assert_eq!(parsed.time_code, "021853");
        assert_eq!(parsed.wind, None);
    }

    #[test]
    fn missing_time_discards_line() {
        assert_eq!(parse_report("KDFW 18012G20KT 10SM"), None);
        assert_eq!(parse_report(""), None);
        assert_eq!(parse_report("No METARs found"), None);
    }

    #[test]
    fn toward_is_opposite_of_from() {
        assert_eq!(WindDirection::Degrees(180).toward_degrees(), Some(0.0));
        assert_eq!(WindDirection::Degrees(0).toward_degrees(), Some(180.0));
        assert_eq!(WindDirection::Degrees(270).toward_degrees(), Some(90.0));
        assert_eq!(WindDirection::Degrees(45).toward_degrees(), Some(225.0));
    }

    #[test]
    fn direction_text_round_trips() {
        for text in ["000", "090", "185", "VRB"] {
            let dir: WindDirection = text.parse().unwrap();
            assert_eq!(dir.to_string(), text);
        }
        assert!("abc".parse::<WindDirection>().is_err());
        assert!("361".parse::<WindDirection>().is_err());
    }
}
