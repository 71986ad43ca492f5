use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use scout_domain::{PageFetcher, ScoutError, ScoutResult, SearchParams};

/// One external listing source the search stage can query.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Listing URLs matching the filters, capped at the params' limit.
    async fn search(&self, params: &SearchParams) -> ScoutResult<Vec<String>>;
}

/// Configurable source definition: where to search and how to find listing
/// links on the result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDefinition {
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    #[serde(default = "default_link_selector")]
    pub link_selector: String,
}

fn default_search_path() -> String {
    "/search".to_string()
}

fn default_link_selector() -> String {
    ".product-item a.product-link".to_string()
}

/// Source adapter that drives an HTML search page.
pub struct HtmlSource {
    definition: SourceDefinition,
    fetcher: Arc<dyn PageFetcher>,
}

impl HtmlSource {
    pub fn new(definition: SourceDefinition, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            definition,
            fetcher,
        }
    }

    fn search_url(&self, params: &SearchParams) -> ScoutResult<Url> {
        let base = Url::parse(&self.definition.base_url).map_err(|e| {
            ScoutError::config_error(format!(
                "source {}: invalid base url {}: {e}",
                self.definition.name, self.definition.base_url
            ))
        })?;
        let mut url = base.join(&self.definition.search_path).map_err(|e| {
            ScoutError::config_error(format!(
                "source {}: invalid search path: {e}",
                self.definition.name
            ))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("q", &params.keywords);
            if let Some(category) = &params.category {
                query.append_pair("category", category);
            }
            if let Some(min_price) = params.min_price {
                query.append_pair("min_price", &min_price.to_string());
            }
            if let Some(max_price) = params.max_price {
                query.append_pair("max_price", &max_price.to_string());
            }
        }
        Ok(url)
    }
}

/// Pull listing hrefs out of a result page, resolved against the base url.
/// Synchronous on purpose: the parsed DOM must not be held across awaits.
fn extract_links(html: &str, selector: &str, base: &Url, limit: usize) -> ScoutResult<Vec<String>> {
    let selector = Selector::parse(selector)
        .map_err(|e| ScoutError::config_error(format!("invalid link selector: {e}")))?;
    let document = Html::parse_document(html);
    let mut links = Vec::new();
    for element in document.select(&selector) {
        if links.len() >= limit {
            break;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        match base.join(href) {
            Ok(url) => links.push(url.to_string()),
            Err(e) => debug!("Ignoring unresolvable listing href {}: {}", href, e),
        }
    }
    Ok(links)
}

#[async_trait]
impl SourceAdapter for HtmlSource {
    fn name(&self) -> &str {
        &self.definition.name
    }

    async fn search(&self, params: &SearchParams) -> ScoutResult<Vec<String>> {
        let url = self.search_url(params)?;
        debug!("Source {}: searching {}", self.definition.name, url);
        let html = self.fetcher.fetch(url.as_str()).await?;

        let base = Url::parse(&self.definition.base_url)
            .map_err(|e| ScoutError::config_error(format!("invalid base url: {e}")))?;
        let links = extract_links(
            &html,
            &self.definition.link_selector,
            &base,
            params.effective_limit() as usize,
        )?;
        debug!(
            "Source {}: {} listing(s) for '{}'",
            self.definition.name,
            links.len(),
            params.keywords
        );
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixtureFetcher {
        html: String,
        last_url: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl PageFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str) -> ScoutResult<String> {
            *self.last_url.lock().unwrap() = Some(url.to_string());
            Ok(self.html.clone())
        }
    }

    fn definition() -> SourceDefinition {
        SourceDefinition {
            name: "fixture".to_string(),
            base_url: "https://shop.example".to_string(),
            search_path: default_search_path(),
            link_selector: default_link_selector(),
        }
    }

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <div class="product-item"><a class="product-link" href="/p/1">One</a></div>
          <div class="product-item"><a class="product-link" href="/p/2">Two</a></div>
          <div class="product-item"><a class="product-link" href="https://shop.example/p/3">Three</a></div>
          <div class="other"><a class="product-link" href="/ignored">Nope</a></div>
        </body></html>
    "#;

    #[tokio::test]
    async fn test_search_collects_resolved_links_up_to_limit() {
        let fetcher = Arc::new(FixtureFetcher {
            html: SEARCH_PAGE.to_string(),
            last_url: std::sync::Mutex::new(None),
        });
        let source = HtmlSource::new(definition(), fetcher.clone());

        let mut params = SearchParams::new("desk lamp");
        params.category = Some("home".to_string());
        params.min_price = Some(5.0);
        let urls = source.search(&params).await.unwrap();
        assert_eq!(
            urls,
            vec![
                "https://shop.example/p/1",
                "https://shop.example/p/2",
                "https://shop.example/p/3",
            ]
        );

        let queried = fetcher.last_url.lock().unwrap().clone().unwrap();
        assert!(queried.starts_with("https://shop.example/search?"));
        assert!(queried.contains("q=desk+lamp"));
        assert!(queried.contains("category=home"));
        assert!(queried.contains("min_price=5"));

        params.limit = 2;
        let urls = source.search(&params).await.unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_not_error() {
        let fetcher = Arc::new(FixtureFetcher {
            html: "<html><body><p>nothing here</p></body></html>".to_string(),
            last_url: std::sync::Mutex::new(None),
        });
        let source = HtmlSource::new(definition(), fetcher);
        let urls = source.search(&SearchParams::new("anything")).await.unwrap();
        assert!(urls.is_empty());
    }
}
