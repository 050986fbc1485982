/// Listing page fetcher
use crate::config::{HttpConfig, SiteConfig};
use crate::error::{ArchiveError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, DNT, UPGRADE_INSECURE_REQUESTS};
use reqwest::Client;
use tracing::debug;

/// Source of listing page markup, indexed from 1
#[async_trait]
pub trait PageSource: Send + Sync {
    /// URL of the given page, as requested
    fn page_url(&self, page: u32) -> String;

    /// Raw markup of the given page
    async fn fetch_page(&self, page: u32) -> Result<String>;
}

/// Build the shared HTTP session with browser-like headers
pub fn build_client(http: &HttpConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, ACCEPT, &http.accept)?;
    insert_header(&mut headers, ACCEPT_LANGUAGE, &http.accept_language)?;
    insert_header(&mut headers, DNT, "1")?;
    insert_header(&mut headers, UPGRADE_INSECURE_REQUESTS, "1")?;

    let client = Client::builder()
        .timeout(http.timeout())
        .user_agent(http.user_agent.as_str())
        .default_headers(headers)
        .build()?;

    Ok(client)
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| ArchiveError::Config(format!("invalid {} header: {}", name, e)))?;
    headers.insert(name, value);
    Ok(())
}

/// Fetches listing pages over HTTP
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    listing_url: String,
    nav_anchor: String,
}

impl PageFetcher {
    pub fn new(client: Client, site: &SiteConfig) -> Self {
        Self {
            client,
            listing_url: site.listing_url.clone(),
            nav_anchor: site.nav_anchor.clone(),
        }
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            self.listing_url.clone()
        } else {
            format!("{}page-{}#{}", self.listing_url, page, self.nav_anchor)
        }
    }

    async fn fetch_page(&self, page: u32) -> Result<String> {
        let url = self.page_url(page);
        let page_error = |reason: String| ArchiveError::PageFetch {
            page,
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| page_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(page_error(format!("HTTP {}", response.status())));
        }

        let html_content = response.text().await.map_err(|e| page_error(e.to_string()))?;
        debug!("📄 Downloaded {} characters of HTML from page {}", html_content.len(), page);

        Ok(html_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn fetcher() -> PageFetcher {
        let config = Config::default();
        let client = build_client(&config.http).unwrap();
        PageFetcher::new(client, &config.site)
    }

    #[test]
    fn test_first_page_uses_listing_url() {
        let fetcher = fetcher();
        assert_eq!(fetcher.page_url(1), Config::default().site.listing_url);
    }

    #[test]
    fn test_later_pages_append_segment_and_anchor() {
        let fetcher = fetcher();
        assert_eq!(
            fetcher.page_url(2),
            "https://zonesons.com/repliques-cultes-de-films-d-espionnage/phrases-cultes-de-oss-117-le-caire-nid-d-espions/page-2#navtop"
        );
        assert!(fetcher.page_url(96).ends_with("/page-96#navtop"));
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut http = HttpConfig::default();
        http.accept_language = "fr\nFR".to_string();
        assert!(matches!(build_client(&http), Err(ArchiveError::Config(_))));
    }
}
