use std::time::Duration;

use reqwest::Client;
use sitewatch_core::error::AppError;
use sitewatch_core::traits::LinkFetcher;

use crate::links::extract_links;

/// HTTP link fetcher using reqwest.
///
/// Downloads a page with a bounded timeout and returns its anchor hrefs.
/// A non-2xx response is an error, never an empty page.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent(concat!("sitewatch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Download the body of `url` as text.
    pub async fn fetch_page(&self, url: &str) -> Result<String, AppError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::FetchError {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::FetchError {
                    url: url.to_string(),
                    message: format!("Failed to read response body: {e}"),
                }
            }
        })
    }
}

impl LinkFetcher for ReqwestFetcher {
    async fn fetch_links(&self, url: &str) -> Result<Vec<String>, AppError> {
        let html = self.fetch_page(url).await?;
        let links = extract_links(&html);
        tracing::debug!(%url, links = links.len(), "Fetched page");
        Ok(links)
    }
}
