use anyhow::Error;
use slog::{debug, info, Logger};
use std::sync::Arc;
use time::OffsetDateTime;
use time_tz::{OffsetDateTimeExt, Tz};

use crate::{parse_report, resolve_report_time, ReportSource, WindDirection};

/// One dated METAR with its wind group.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub report_time: OffsetDateTime,
    pub fetch_time: OffsetDateTime,
    pub raw_text: String,
    pub wind_direction: Option<WindDirection>,
    /// knots
    pub wind_speed: Option<u32>,
    /// knots
    pub wind_gust: Option<u32>,
}

impl Observation {
    /// Parse and date a single report line. `None` when the line has no time
    /// group or the time group doesn't resolve to a real date.
    pub fn from_report(
        line: &str,
        fetch_time: OffsetDateTime,
        now: OffsetDateTime,
        tz: &Tz,
    ) -> Option<Observation> {
        let line = line.trim();
        let parsed = parse_report(line)?;
        let report_time = resolve_report_time(parsed.time_code, now, tz).ok()?;
        Some(Observation {
            report_time,
            fetch_time,
            raw_text: line.to_string(),
            wind_direction: parsed.wind.and_then(|w| w.direction),
            wind_speed: parsed.wind.map(|w| w.speed),
            wind_gust: parsed.wind.and_then(|w| w.gust),
        })
    }
}

/// Parse every line of a raw fetch, stamping all of them with the same
/// fetch time. Lines that can't be parsed or dated are dropped; the count of
/// dropped non-blank lines is returned alongside.
pub fn parse_observations(raw: &str, now: OffsetDateTime, tz: &Tz) -> (Vec<Observation>, usize) {
    let fetch_time = now.to_timezone(tz);
    let mut skipped = 0;
    let observations = raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let observation = Observation::from_report(line, fetch_time, now, tz);
            if observation.is_none() {
                skipped += 1;
            }
            observation
        })
        .collect();
    (observations, skipped)
}

pub struct ObservationService<S: ReportSource> {
    pub logger: Logger,
    pub source: Arc<S>,
    pub tz: &'static Tz,
}

impl<S: ReportSource> ObservationService<S> {
    pub fn new(logger: Logger, source: Arc<S>, tz: &'static Tz) -> Self {
        ObservationService { logger, source, tz }
    }

    /// Fetch the trailing `hours` of reports for `station` and parse them, in
    /// the order the source returned them. Transport errors are returned
    /// as-is; unparseable lines are dropped.
    pub async fn get_observations(
        &self,
        station: &str,
        hours: u32,
        now: OffsetDateTime,
    ) -> Result<Vec<Observation>, Error> {
        info!(
            self.logger,
            "fetching {} hours of observations for {}", hours, station
        );
        let raw = self.source.fetch_raw(station, hours).await?;
        let (observations, skipped) = parse_observations(&raw, now, self.tz);
        if skipped > 0 {
            debug!(self.logger, "skipped {} unparseable report lines", skipped);
        }
        info!(
            self.logger,
            "parsed {} observations for {}",
            observations.len(),
            station
        );
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockReportSource;
    use anyhow::anyhow;
    use slog::{o, Discard};
    use time::macros::datetime;
    use time_tz::timezones;

    const RAW: &str = "KDFW 021853Z 18012G20KT 10SM FEW250 27/14 A2992 RMK AO2\n\
\n\
KDFW 021753Z 17009KT 10SM FEW250 26/14 A2994 RMK AO2\n\
garbage without a time group\n\
KDFW 021860Z 17009KT 10SM\n\
KDFW 021653Z AUTO 10SM CLR 25/13 A2995\n";

    fn chicago() -> &'static Tz {
        timezones::get_by_name("America/Chicago").unwrap()
    }

    fn logger() -> Logger {
        Logger::root(Discard, o!())
    }

    #[test]
    fn parses_end_to_end_report() {
        let now = datetime!(2024-04-02 19:00:00 UTC);
        let fetch_time = now.to_timezone(chicago());
        let obs = Observation::from_report(
            "  KDFW 021853Z 18012G20KT 10SM FEW250  ",
            fetch_time,
            now,
            chicago(),
        )
        .unwrap();

        assert_eq!(obs.wind_direction, Some(WindDirection::Degrees(180)));
        assert_eq!(obs.wind_speed, Some(12));
        assert_eq!(obs.wind_gust, Some(20));
        assert_eq!(obs.report_time, datetime!(2024-04-02 13:53:00 -05:00));
        assert_eq!(obs.report_time.offset().whole_hours(), -5);
        assert_eq!(obs.raw_text, "KDFW 021853Z 18012G20KT 10SM FEW250");
    }

    #[test]
    fn drops_undatable_lines_and_keeps_source_order() {
        let now = datetime!(2024-04-02 19:00:00 UTC);
        let (observations, skipped) = parse_observations(RAW, now, chicago());

        // "garbage" has no time group, 021860Z has minute 60
        assert_eq!(skipped, 2);
        assert_eq!(observations.len(), 3);
        let times: Vec<_> = observations.iter().map(|o| o.report_time).collect();
        assert_eq!(
            times,
            vec![
                datetime!(2024-04-02 18:53:00 UTC),
                datetime!(2024-04-02 17:53:00 UTC),
                datetime!(2024-04-02 16:53:00 UTC),
            ]
        );

        // no wind group, still dated
        assert_eq!(observations[2].wind_speed, None);
        assert_eq!(observations[2].wind_direction, None);
    }

    #[test]
    fn keeps_previous_month_tail_early_in_month() {
        let now = datetime!(2024-04-02 19:00:00 UTC);
        let raw = "KDFW 311753Z 17009KT 10SM\nKDFW 021853Z 18012KT 10SM\n";
        let (observations, skipped) = parse_observations(raw, now, chicago());

        assert_eq!(skipped, 0);
        assert_eq!(observations.len(), 2);
        assert_eq!(
            observations[0].report_time,
            datetime!(2024-03-31 12:53:00 -05:00)
        );
        assert_eq!(observations[0].wind_speed, Some(9));
    }

    #[test]
    fn drops_day_missing_from_previous_month() {
        let now = datetime!(2024-03-02 19:00:00 UTC);
        let raw = "KDFW 251753Z 17009KT\nKDFW 301753Z 17009KT\n";
        let (observations, skipped) = parse_observations(raw, now, chicago());

        assert_eq!(skipped, 1);
        assert_eq!(observations.len(), 1);
        assert_eq!(
            observations[0].report_time,
            datetime!(2024-02-25 17:53:00 UTC)
        );
    }

    #[test]
    fn stamps_all_lines_with_one_fetch_time() {
        let now = datetime!(2024-04-02 19:00:00 UTC);
        let (observations, _) = parse_observations(RAW, now, chicago());
        for observation in &observations {
            assert_eq!(observation.fetch_time, now);
            assert_eq!(observation.fetch_time.offset().whole_hours(), -5);
        }
    }

    #[tokio::test]
    async fn service_fetches_window_for_station() {
        let mut source = MockReportSource::new();
        source
            .expect_fetch_raw()
            .withf(|station, hours| station == "KDFW" && *hours == 24)
            .times(1)
            .returning(|_, _| Ok(RAW.to_string()));

        let service = ObservationService::new(logger(), Arc::new(source), chicago());
        let observations = service
            .get_observations("KDFW", 24, datetime!(2024-04-02 19:00:00 UTC))
            .await
            .unwrap();
        assert_eq!(observations.len(), 3);
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let mut source = MockReportSource::new();
        source
            .expect_fetch_raw()
            .returning(|_, _| Err(anyhow!("connection refused")));

        let service = ObservationService::new(logger(), Arc::new(source), chicago());
        let result = service
            .get_observations("KDFW", 2, datetime!(2024-04-02 19:00:00 UTC))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_response_yields_no_observations() {
        let mut source = MockReportSource::new();
        source
            .expect_fetch_raw()
            .returning(|_, _| Ok(String::new()));

        let service = ObservationService::new(logger(), Arc::new(source), chicago());
        let observations = service
            .get_observations("KDFW", 2, datetime!(2024-04-02 19:00:00 UTC))
            .await
            .unwrap();
        assert!(observations.is_empty());
    }
}
