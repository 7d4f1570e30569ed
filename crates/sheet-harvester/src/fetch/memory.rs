//! In-memory fetcher serving pages registered ahead of time.
//!
//! Used to replay saved pages offline and to drive the harvester in tests.

use super::PageFetcher;
use crate::error::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

#[derive(Debug, Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page body; unregistered URLs answer 404
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.pages.insert(url.into(), body.into());
    }

    /// URLs requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for MemoryFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
