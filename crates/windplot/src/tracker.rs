use anyhow::{anyhow, Error};
use slog::{info, warn, Logger};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use windplot_core::{ensure_dir_exists, path_exists};

use crate::{
    load_dataset, merge_observations, save_dataset, Cli, ObservationService, ReportSource,
    WindChartRenderer, MAX_UNAMBIGUOUS_WINDOW_HOURS,
};

/// What a single run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub hours: u32,
    pub fetched: usize,
    pub added: usize,
    pub total: usize,
}

/// Fetches, merges, charts and persists one station's wind observations.
pub struct WindTracker<S: ReportSource> {
    logger: Logger,
    station: String,
    hours: u32,
    refresh_hours: u32,
    dataset_file: PathBuf,
    chart_file: PathBuf,
    observations: ObservationService<S>,
    renderer: WindChartRenderer,
}

impl<S: ReportSource> WindTracker<S> {
    pub fn new(logger: Logger, cli: &Cli, source: Arc<S>) -> Result<Self, Error> {
        let chart_options = cli.chart_options()?;
        let tz = chart_options.tz;

        for hours in [cli.hours(), cli.refresh_hours()] {
            if hours > MAX_UNAMBIGUOUS_WINDOW_HOURS {
                warn!(
                    logger,
                    "{} hour window is wider than {} hours, month boundary reports may be misdated",
                    hours,
                    MAX_UNAMBIGUOUS_WINDOW_HOURS
                );
            }
        }

        Ok(WindTracker {
            station: cli.station(),
            hours: cli.hours(),
            refresh_hours: cli.refresh_hours(),
            dataset_file: cli.dataset_file(),
            chart_file: cli.chart_file(),
            observations: ObservationService::new(logger.clone(), source, tz),
            renderer: WindChartRenderer::new(logger.clone(), chart_options),
            logger,
        })
    }

    pub fn dataset_file(&self) -> &Path {
        &self.dataset_file
    }

    pub fn chart_file(&self) -> &Path {
        &self.chart_file
    }

    /// Full window until a dataset has been persisted, the refresh window after.
    pub fn window_hours(&self) -> u32 {
        if path_exists(&self.dataset_file) {
            self.refresh_hours
        } else {
            self.hours
        }
    }

    /// One fetch, merge, render and persist cycle as of `now`.
    ///
    /// A failed fetch returns before the persisted dataset is read or
    /// written. The dataset is only saved after the chart has been drawn.
    pub async fn run_once(&self, now: OffsetDateTime) -> Result<RunSummary, Error> {
        let hours = self.window_hours();
        let fetched = self
            .observations
            .get_observations(&self.station, hours, now)
            .await?;
        let fetched_count = fetched.len();

        let existing = load_dataset(&self.dataset_file).map_err(|e| {
            anyhow!(
                "error loading dataset {}: {}",
                self.dataset_file.display(),
                e
            )
        })?;
        let previous = existing.len();
        let dataset = merge_observations(existing, fetched);
        let summary = RunSummary {
            hours,
            fetched: fetched_count,
            added: dataset.len() - previous,
            total: dataset.len(),
        };
        info!(
            self.logger,
            "merged {} new of {} fetched observations, dataset now {}",
            summary.added,
            summary.fetched,
            summary.total
        );

        for path in [&self.chart_file, &self.dataset_file] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !ensure_dir_exists(parent) {
                    return Err(anyhow!("unable to create folder: {}", parent.display()));
                }
            }
        }

        self.renderer.render(&dataset, now, &self.chart_file)?;
        save_dataset(&dataset, &self.dataset_file).map_err(|e| {
            anyhow!(
                "error saving dataset {}: {}",
                self.dataset_file.display(),
                e
            )
        })?;
        info!(
            self.logger,
            "saved {} observations to {}",
            summary.total,
            self.dataset_file.display()
        );

        Ok(summary)
    }
}
