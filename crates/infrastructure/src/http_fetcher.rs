use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use scout_domain::{PageFetcher, ScoutError, ScoutResult};

/// reqwest-backed page fetcher used by the search and scrape stages.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> ScoutResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScoutError::config_error(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> ScoutResult<String> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScoutError::network_error(format!("GET {url}: {e}")))?;
        let response = response
            .error_for_status()
            .map_err(|e| ScoutError::network_error(format!("GET {url}: {e}")))?;
        response
            .text()
            .await
            .map_err(|e| ScoutError::network_error(format!("read body of {url}: {e}")))
    }
}
