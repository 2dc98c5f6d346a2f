use slog::{error, info, Logger};
use std::{sync::Arc, time::Duration};
use time::OffsetDateTime;
use tokio::time::interval;
use windplot::{get_config_info, setup_logger, MetarFetcher, WindTracker};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = get_config_info()?;
    let logger = setup_logger(&cli);

    info!(logger, "windplot starting...");
    info!(logger, "  Station: {}", cli.station());
    info!(logger, "  Dataset: {}", cli.dataset_file().display());
    info!(logger, "  Chart: {}", cli.chart_file().display());

    let fetcher = Arc::new(MetarFetcher::new(
        logger.clone(),
        cli.base_url(),
        &cli.user_agent(),
        cli.max_retries(),
        cli.request_timeout(),
    )?);
    let tracker = WindTracker::new(logger.clone(), &cli, fetcher)?;

    match cli.interval() {
        Some(every) => run_on_interval(&tracker, &logger, every).await,
        None => {
            let summary = tracker.run_once(OffsetDateTime::now_utc()).await?;
            info!(
                logger,
                "done: {} observations ({} new)", summary.total, summary.added
            );
        }
    }
    Ok(())
}

async fn run_on_interval(tracker: &WindTracker<MetarFetcher>, logger: &Logger, every: Duration) {
    info!(
        logger,
        "Wait time between data pulls: {} seconds",
        every.as_secs()
    );

    let mut ticker = interval(every);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match tracker.run_once(OffsetDateTime::now_utc()).await {
                    Ok(summary) => info!(
                        logger,
                        "Finished run ({} new, {} total), waiting {} seconds for next run",
                        summary.added,
                        summary.total,
                        every.as_secs()
                    ),
                    Err(err) => error!(logger, "Error processing data: {}", err)
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(logger, "Shutting down");
                break;
            }
        }
    }
}
