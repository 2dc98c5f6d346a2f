//! Resolution of the `DDHHMM` group of a METAR into an absolute time.
//!
//! Reports only carry day-of-month, hour and minute in UTC. The month and
//! year are borrowed from the reference instant, with one correction: early
//! in a month, a report dated later than "today" must still be from the tail
//! of the previous month.

use time::{Date, Month, OffsetDateTime, Time, UtcOffset};
use time_tz::{OffsetDateTimeExt, Tz};

/// Last day of a month on which reports dated after "today" are assigned to
/// the previous month.
pub const MONTH_ROLLOVER_MAX_DAY: u8 = 4;

/// Widest fetch window the rollover rule dates correctly. Anything wider can
/// reach back past the start of the previous month's tail and gets
/// misattributed to the current month.
pub const MAX_UNAMBIGUOUS_WINDOW_HOURS: u32 = MONTH_ROLLOVER_MAX_DAY as u32 * 24;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("malformed observation time code: {0:?}")]
    Code(String),
    #[error("observation time out of range: {0}")]
    Range(#[from] time::error::ComponentRange),
}

/// Day, hour and minute as carried by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTime {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl DayTime {
    /// Split a six digit `DDHHMM` code. Range checks happen at resolution.
    pub fn parse(code: &str) -> Result<Self, Error> {
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Code(code.to_string()));
        }
        let field = |range: std::ops::Range<usize>| {
            code[range]
                .parse::<u8>()
                .map_err(|_| Error::Code(code.to_string()))
        };
        Ok(DayTime {
            day: field(0..2)?,
            hour: field(2..4)?,
            minute: field(4..6)?,
        })
    }
}

/// Pick the year and month a report day belongs to, relative to `now_utc`.
pub fn resolve_year_month(day: u8, now_utc: OffsetDateTime) -> (i32, Month) {
    let today = now_utc.day();
    if day > today && today <= MONTH_ROLLOVER_MAX_DAY {
        let month = now_utc.month().previous();
        let year = if month == Month::December {
            now_utc.year() - 1
        } else {
            now_utc.year()
        };
        (year, month)
    } else {
        (now_utc.year(), now_utc.month())
    }
}

/// Resolve a report's day/time into an absolute instant expressed in `tz`.
///
/// Fails when the resolved calendar date doesn't exist (e.g. day 30 while
/// resolving into February) or the hour/minute are out of range.
pub fn resolve_day_time(
    day_time: DayTime,
    now: OffsetDateTime,
    tz: &Tz,
) -> Result<OffsetDateTime, Error> {
    let now_utc = now.to_offset(UtcOffset::UTC);
    let (year, month) = resolve_year_month(day_time.day, now_utc);
    let date = Date::from_calendar_date(year, month, day_time.day)?;
    let time = Time::from_hms(day_time.hour, day_time.minute, 0)?;
    Ok(date.with_time(time).assume_utc().to_timezone(tz))
}

/// Convenience wrapper over [`DayTime::parse`] and [`resolve_day_time`].
pub fn resolve_report_time(
    code: &str,
    now: OffsetDateTime,
    tz: &Tz,
) -> Result<OffsetDateTime, Error> {
    resolve_day_time(DayTime::parse(code)?, now, tz)
}
