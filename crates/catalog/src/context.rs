//! Catalog context: one storage handle and the content visibility flags.
//!
//! A `Catalog` is built once at start-up and handed to every operation. The
//! typed stores it returns borrow its connection.

use crate::config::{Config, ContentConfig};
use crate::db::Database;
use crate::links::SheetLinks;
use crate::store::{CategoryStore, ContactStore, SheetIndexStore, SheetStore, TrackingStore};
use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

/// Which flagged sheets listing queries return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentVisibility {
    pub include_adult: bool,
    pub include_explicit: bool,
}

impl From<&ContentConfig> for ContentVisibility {
    fn from(config: &ContentConfig) -> Self {
        Self {
            include_adult: config.include_adult,
            include_explicit: config.include_explicit,
        }
    }
}

/// Storage context passed to every catalog operation
pub struct Catalog {
    db: Database,
    visibility: ContentVisibility,
}

impl Catalog {
    pub fn new(db: Database, visibility: ContentVisibility) -> Self {
        Self { db, visibility }
    }

    /// Open the configured database with the configured visibility
    pub fn open(config: &Config) -> Result<Self> {
        let db_path = config.database_path();
        let db = Database::open(&db_path)
            .with_context(|| format!("Failed to open catalog at {}", db_path.display()))?;
        let visibility = ContentVisibility::from(&config.content);

        info!(
            db_path = %db_path.display(),
            include_adult = visibility.include_adult,
            include_explicit = visibility.include_explicit,
            "Catalog opened"
        );

        Ok(Self::new(db, visibility))
    }

    pub fn conn(&self) -> &Connection {
        self.db.conn()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn visibility(&self) -> ContentVisibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: ContentVisibility) {
        self.visibility = visibility;
    }

    pub fn categories(&self) -> CategoryStore<'_> {
        CategoryStore::new(self)
    }

    pub fn contacts(&self) -> ContactStore<'_> {
        ContactStore::new(self)
    }

    pub fn sheets(&self) -> SheetStore<'_> {
        SheetStore::new(self)
    }

    pub fn sheet_index(&self) -> SheetIndexStore<'_> {
        SheetIndexStore::new(self)
    }

    pub fn tracking(&self) -> TrackingStore<'_> {
        TrackingStore::new(self)
    }

    pub fn links(&self) -> SheetLinks<'_> {
        SheetLinks::new(self)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// Fresh catalog in a temporary directory; keep the TempDir alive
    pub fn temp_catalog() -> Result<(TempDir, Catalog)> {
        let temp_dir = TempDir::new()?;
        let db = Database::open(temp_dir.path().join("catalog.db"))?;
        Ok((temp_dir, Catalog::new(db, ContentVisibility::default())))
    }
}
