//! Error types for page fetching and harvesting.

use catalog::CatalogError;
use thiserror::Error;

/// Failure to obtain a page body
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure of a harvest operation
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{field} is missing on {url}")]
    MissingField { url: String, field: &'static str },

    #[error("harvest cancelled")]
    Cancelled,
}

pub type HarvestResult<T> = Result<T, HarvestError>;
