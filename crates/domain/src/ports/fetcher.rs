use async_trait::async_trait;

use crate::ScoutResult;

/// Fetches a page body for the search and scrape stages. Production uses an
/// HTTP client; tests substitute canned HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> ScoutResult<String>;
}
