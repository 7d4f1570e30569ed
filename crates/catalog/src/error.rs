//! Error values returned by catalog operations.
//!
//! Every public storage operation returns a [`CatalogResult`]. Engine errors
//! are logged where they are converted and callers only ever see the generic
//! [`CatalogError::Storage`] message.

use thiserror::Error;
use tracing::error;

/// Result type for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Failure kinds of a catalog operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// A required field is empty, a URL is malformed or a number is out of range
    #[error("validation failed: {0}")]
    Validation(String),

    /// The natural key is already used by another row
    #[error("duplicate entry: {0}")]
    Duplicate(String),

    /// The row addressed by id does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The statement could not be executed
    #[error("storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        CatalogError::Duplicate(message.into())
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, CatalogError::Duplicate(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation(_))
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        error!(error = %err, "Storage statement failed");
        CatalogError::Storage("the storage operation could not be completed".to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        error!(error = %err, "Failed to encode stored value");
        CatalogError::Storage("a stored value could not be encoded".to_string())
    }
}
