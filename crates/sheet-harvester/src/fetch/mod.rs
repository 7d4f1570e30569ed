//! Page fetching.
//!
//! Fetchers hand back the raw body; parsing happens in the caller so that
//! no parsed document is held across an await point.

pub mod http;
pub mod memory;
pub mod pacer;

pub use http::HttpFetcher;
pub use memory::MemoryFetcher;
pub use pacer::Pacer;

use crate::error::FetchError;
use async_trait::async_trait;
use url::Url;

/// Source of page bodies
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

