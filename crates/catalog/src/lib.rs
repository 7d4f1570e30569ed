//! Local catalog store for sheets harvested from the cataloging site.
//!
//! This crate provides the functionality shared by the harvester:
//! - Configuration management
//! - Database bootstrap and typed entity stores
//! - Natural-key upserts and multi-row writes
//! - Logging infrastructure
//! - Shared error types

pub mod bulk;
pub mod config;
pub mod context;
pub mod db;
pub mod enums;
pub mod error;
pub mod links;
pub mod logging;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use bulk::{BulkReport, InsertMode};
pub use config::Config;
pub use context::{Catalog, ContentVisibility};
pub use db::Database;
pub use enums::*;
pub use error::{CatalogError, CatalogResult};
pub use links::SheetLinks;
pub use logging::LogConfig;
pub use models::*;
pub use store::{Keyed, KeyedStore, Page};
