use anyhow::{anyhow, Error};
use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use slog::{debug, Logger};
use std::time::Duration;

/// Source of raw, newline separated METAR text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Raw reports for `station` covering the trailing `hours`.
    async fn fetch_raw(&self, station: &str, hours: u32) -> Result<String, Error>;
}

/// Pulls raw METARs from the aviationweather.gov data API.
pub struct MetarFetcher {
    logger: Logger,
    base_url: String,
    timeout: Duration,
    client: ClientWithMiddleware,
}

impl MetarFetcher {
    pub fn new(
        logger: Logger,
        base_url: String,
        user_agent: &str,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<MetarFetcher, Error> {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = ClientBuilder::new(Client::builder().user_agent(user_agent).build()?)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        Ok(Self {
            logger,
            base_url,
            timeout,
            client,
        })
    }

    pub fn url(&self, station: &str, hours: u32) -> String {
        format!(
            "{}?ids={}&hours={}&order=id%2C-obs&sep=true",
            self.base_url.trim_end_matches('/'),
            station,
            hours
        )
    }
}

#[async_trait]
impl ReportSource for MetarFetcher {
    async fn fetch_raw(&self, station: &str, hours: u32) -> Result<String, Error> {
        let url = self.url(station, hours);
        debug!(self.logger, "requesting: {}", url);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| anyhow!("error sending request: {}", e))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "error response from {}: {}",
                url,
                response.status()
            ));
        }
        response
            .text()
            .await
            .map_err(|e| anyhow!("error reading body of request: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::{o, Discard};

    #[test]
    fn builds_metar_query_url() {
        let fetcher = MetarFetcher::new(
            Logger::root(Discard, o!()),
            String::from("https://aviationweather.gov/api/data/metar/"),
            "windplot-test",
            0,
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            fetcher.url("KDFW", 24),
            "https://aviationweather.gov/api/data/metar?ids=KDFW&hours=24&order=id%2C-obs&sep=true"
        );
    }
}
