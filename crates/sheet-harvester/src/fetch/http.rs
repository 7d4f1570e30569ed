//! HTTP fetcher for the live site.

use super::PageFetcher;
use crate::error::FetchError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use catalog::config::SiteConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Plain GET fetcher; one attempt per page, failures go back to the caller
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub fn from_config(site: &SiteConfig) -> Result<Self> {
        Self::new(&site.user_agent, Duration::from_secs(site.timeout_seconds))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Page request failed");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        debug!(url = %url, bytes = body.len(), "Page fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetcher_creation() {
        let fetcher = HttpFetcher::from_config(&SiteConfig::default());
        assert!(fetcher.is_ok());
    }
}
