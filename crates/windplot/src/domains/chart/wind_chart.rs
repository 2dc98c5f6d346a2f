use anyhow::{anyhow, Error};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::FontTransform;
use slog::{info, Logger};
use std::ops::Range;
use std::path::Path;
use time::{macros::format_description, OffsetDateTime};
use time_tz::{OffsetDateTimeExt, Tz};

use crate::{Dataset, DisplayUnit};

const SPEED_COLOR: RGBColor = RGBColor(31, 119, 180);
const GUST_COLOR: RGBColor = RGBColor(214, 39, 40);
const NOW_COLOR: RGBColor = RGBColor(128, 128, 128);
const VECTOR_COLOR: RGBColor = RGBColor(255, 165, 0);

/// Smallest upper bound for the speed axis
const MIN_Y_MAX: f64 = 5.0;
const Y_HEADROOM: f64 = 1.1;
/// Smallest time span shown, in seconds
const MIN_X_SPAN: i64 = 3600;
/// Dash and gap length of the "now" marker, per stroke width
const NOW_DASH_PX: u32 = 4;

/// A wind direction arrow anchored on the speed curve.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionVector {
    /// (unix seconds, speed in display units)
    pub at: (i64, f64),
    /// Compass bearing the wind blows toward
    pub toward_degrees: f64,
}

impl DirectionVector {
    /// Pixel offset from anchor to tip for an arrow `length` pixels long.
    /// North is up; screen y grows downward.
    pub fn pixel_offset(&self, length: f64) -> (i32, i32) {
        let rad = self.toward_degrees.to_radians();
        (
            (rad.sin() * length).round() as i32,
            (-rad.cos() * length).round() as i32,
        )
    }
}

/// Everything the chart shows, in data coordinates. X values are unix seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlan {
    /// Observed speeds plus the carried-forward point at `now`
    pub speed: Vec<(i64, f64)>,
    pub gusts: Vec<(i64, f64)>,
    pub vectors: Vec<DirectionVector>,
    pub now: i64,
    pub x_range: Range<i64>,
    pub y_range: Range<f64>,
}

impl ChartPlan {
    /// The speed series as a post-style step line.
    pub fn step_path(&self) -> Vec<(i64, f64)> {
        step_post(&self.speed)
    }
}

/// Expand points into a line that holds each value until the next x.
pub fn step_post(points: &[(i64, f64)]) -> Vec<(i64, f64)> {
    let mut path = Vec::with_capacity(points.len() * 2);
    for pair in points.windows(2) {
        path.push(pair[0]);
        path.push((pair[1].0, pair[0].1));
    }
    if let Some(&last) = points.last() {
        path.push(last);
    }
    path
}

/// Lay out the chart for `dataset` as of `now`.
///
/// With no observations the x axis spans the trailing `window_hours`.
pub fn plan_chart(
    dataset: &Dataset,
    now: OffsetDateTime,
    unit: &DisplayUnit,
    window_hours: u32,
) -> ChartPlan {
    let now_ts = now.unix_timestamp();

    let mut speed: Vec<(i64, f64)> = dataset
        .iter()
        .filter_map(|o| {
            o.wind_speed
                .map(|s| (o.report_time.unix_timestamp(), unit.convert(s)))
        })
        .collect();
    if let Some(&(last_ts, last_speed)) = speed.last() {
        if now_ts > last_ts {
            speed.push((now_ts, last_speed));
        }
    }

    let gusts: Vec<(i64, f64)> = dataset
        .iter()
        .filter_map(|o| {
            o.wind_gust
                .map(|g| (o.report_time.unix_timestamp(), unit.convert(g)))
        })
        .collect();

    let vectors = dataset
        .iter()
        .filter_map(|o| {
            let toward_degrees = o.wind_direction?.toward_degrees()?;
            let speed = o.wind_speed?;
            Some(DirectionVector {
                at: (o.report_time.unix_timestamp(), unit.convert(speed)),
                toward_degrees,
            })
        })
        .collect();

    let mut x_start = dataset
        .first()
        .map(|o| o.report_time.unix_timestamp())
        .unwrap_or(now_ts - i64::from(window_hours) * 3600);
    let x_end = dataset
        .last()
        .map(|o| o.report_time.unix_timestamp())
        .map_or(now_ts, |last| last.max(now_ts));
    if x_end - x_start < MIN_X_SPAN {
        x_start = x_end - MIN_X_SPAN;
    }
    let pad = (x_end - x_start) / 40;

    let y_max = speed
        .iter()
        .chain(gusts.iter())
        .map(|&(_, v)| v)
        .fold(0.0_f64, f64::max);

    ChartPlan {
        speed,
        gusts,
        vectors,
        now: now_ts,
        x_range: (x_start - pad)..(x_end + pad),
        y_range: 0.0..(y_max * Y_HEADROOM).max(MIN_Y_MAX),
    }
}

/// Tick label for unix seconds `ts`, e.g. `Apr-02 13:53`, in `tz`.
pub fn tick_label(ts: i64, tz: &Tz) -> String {
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|dt| {
            dt.to_timezone(tz)
                .format(format_description!(
                    "[month repr:short]-[day] [hour]:[minute]"
                ))
                .ok()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub station: String,
    pub unit: DisplayUnit,
    pub tz: &'static Tz,
    /// inches
    pub width: f64,
    /// inches
    pub height: f64,
    pub dpi: u32,
    /// Span shown when there is nothing to plot
    pub window_hours: u32,
}

impl ChartOptions {
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |inches: f64| (inches * f64::from(self.dpi)).round().max(1.0) as u32;
        (px(self.width), px(self.height))
    }

    /// Convert a font size in points to pixels at the configured dpi.
    fn font_px(&self, points: f64) -> f64 {
        points * f64::from(self.dpi) / 72.0
    }
}

pub struct WindChartRenderer {
    pub logger: Logger,
    pub options: ChartOptions,
}

impl WindChartRenderer {
    pub fn new(logger: Logger, options: ChartOptions) -> Self {
        WindChartRenderer { logger, options }
    }

    /// Draw `dataset` as of `now` into `path`, overwriting it. `.svg` paths
    /// get an SVG, anything else a PNG.
    pub fn render(
        &self,
        dataset: &Dataset,
        now: OffsetDateTime,
        path: &Path,
    ) -> Result<ChartPlan, Error> {
        let plan = plan_chart(dataset, now, &self.options.unit, self.options.window_hours);
        let size = self.options.pixel_size();

        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg {
            let root = SVGBackend::new(path, size).into_drawing_area();
            self.draw(&root, &plan)?;
        } else {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            self.draw(&root, &plan)?;
        }

        info!(
            self.logger,
            "wrote chart of {} observations to {}",
            dataset.len(),
            path.display()
        );
        Ok(plan)
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        plan: &ChartPlan,
    ) -> Result<(), Error> {
        let opts = &self.options;
        let unit = opts.unit.unit;
        let tz = opts.tz;
        let tick_px = opts.font_px(6.0);
        let stroke = (f64::from(opts.dpi) / 100.0).round().max(1.0) as u32;

        root.fill(&WHITE).map_err(draw_error)?;

        let mut chart = ChartBuilder::on(root)
            .caption(
                format!("Wind Speed ({})", opts.station),
                ("sans-serif", opts.font_px(10.0)),
            )
            .margin(opts.font_px(4.0))
            .x_label_area_size(opts.font_px(44.0))
            .y_label_area_size(opts.font_px(24.0))
            .build_cartesian_2d(plan.x_range.clone(), plan.y_range.clone())
            .map_err(draw_error)?;

        chart
            .configure_mesh()
            .x_labels(10)
            .y_labels(8)
            .x_label_formatter(&|ts: &i64| tick_label(*ts, tz))
            .y_label_formatter(&|v: &f64| format!("{:.0}", v))
            .label_style(("sans-serif", tick_px))
            .x_label_style(
                ("sans-serif", tick_px)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .y_desc(format!("Speed ({})", unit))
            .axis_desc_style(("sans-serif", opts.font_px(7.0)))
            .bold_line_style(BLACK.mix(0.2))
            .light_line_style(BLACK.mix(0.05))
            .draw()
            .map_err(draw_error)?;

        chart
            .draw_series(LineSeries::new(
                plan.step_path(),
                SPEED_COLOR.stroke_width(stroke),
            ))
            .map_err(draw_error)?
            .label(format!("Wind Speed ({})", unit))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], SPEED_COLOR.stroke_width(stroke))
            });

        let radius = stroke + 1;
        chart
            .draw_series(
                plan.gusts
                    .iter()
                    .map(|&point| Circle::new(point, radius, GUST_COLOR.filled())),
            )
            .map_err(draw_error)?
            .label(format!("Wind Gusts ({})", unit))
            .legend(move |(x, y)| {
                Circle::new((x + 8, y), radius, GUST_COLOR.filled())
            });

        let (y_low, y_high) = (plan.y_range.start, plan.y_range.end);
        chart
            .draw_series(DashedLineSeries::new(
                vec![(plan.now, y_low), (plan.now, y_high)],
                NOW_DASH_PX * stroke,
                NOW_DASH_PX * stroke,
                NOW_COLOR.stroke_width(1),
            ))
            .map_err(draw_error)?
            .label("Current Time")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], NOW_COLOR.stroke_width(1))
            });

        // Arrows have a fixed on-screen length, so they're drawn in pixel space.
        let arrow_len = opts.font_px(9.0);
        let arrow_style = VECTOR_COLOR.mix(0.8);
        for vector in &plan.vectors {
            let tail = chart.backend_coord(&vector.at);
            let (dx, dy) = vector.pixel_offset(arrow_len);
            let tip = (tail.0 + dx, tail.1 + dy);
            root.draw(&PathElement::new(
                vec![tail, tip],
                arrow_style.stroke_width(stroke),
            ))
            .map_err(draw_error)?;
            root.draw(&Polygon::new(
                arrow_head(tip, vector.toward_degrees, arrow_len * 0.4),
                arrow_style.filled(),
            ))
            .map_err(draw_error)?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font(("sans-serif", tick_px))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK.mix(0.3))
            .draw()
            .map_err(draw_error)?;

        root.present().map_err(draw_error)?;
        Ok(())
    }
}

/// Triangle with its point at `tip`, facing `toward_degrees`.
fn arrow_head(tip: (i32, i32), toward_degrees: f64, size: f64) -> Vec<(i32, i32)> {
    let corner = |spread: f64| {
        let rad = (toward_degrees + spread).to_radians();
        (
            tip.0 - (rad.sin() * size).round() as i32,
            tip.1 + (rad.cos() * size).round() as i32,
        )
    };
    vec![tip, corner(25.0), corner(-25.0)]
}

fn draw_error<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> Error {
    anyhow!("error drawing chart: {}", e)
}
