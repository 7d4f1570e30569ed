//! Personal watch entries, one per stored sheet.

use super::{Keyed, KeyedStore};
use crate::context::Catalog;
use crate::enums::WatchStatus;
use crate::error::CatalogResult;
use crate::models::Tracking;
use rusqlite::{params, OptionalExtension, Row};

const COLUMNS: &str = "id, sheet_ref, status, episodes_seen, note, updated_at";

impl Keyed for Tracking {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn key_label(&self) -> String {
        format!("sheet #{}", self.sheet_ref)
    }

    fn validate(&self) -> CatalogResult<()> {
        Tracking::validate(self)
    }
}

pub struct TrackingStore<'a> {
    catalog: &'a Catalog,
}

impl<'a> TrackingStore<'a> {
    pub(crate) fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn count(&self) -> CatalogResult<i64> {
        Ok(self
            .catalog
            .conn()
            .query_row("SELECT COUNT(*) FROM tracking", [], |row| row.get(0))?)
    }

    pub fn count_by_status(&self, status: WatchStatus) -> CatalogResult<i64> {
        Ok(self.catalog.conn().query_row(
            "SELECT COUNT(*) FROM tracking WHERE status = ?1",
            params![status],
            |row| row.get(0),
        )?)
    }

    pub fn id_by_sheet(&self, sheet_ref: i64) -> CatalogResult<Option<i64>> {
        Ok(self
            .catalog
            .conn()
            .query_row(
                "SELECT id FROM tracking WHERE sheet_ref = ?1 LIMIT 1",
                params![sheet_ref],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn single_by_sheet(&self, sheet_ref: i64) -> CatalogResult<Option<Tracking>> {
        let sql = format!("SELECT {} FROM tracking WHERE sheet_ref = ?1 LIMIT 1", COLUMNS);
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![sheet_ref], row_to_tracking)
            .optional()?)
    }

    /// Entries with a status, most recently updated first
    pub fn select_by_status(&self, status: WatchStatus) -> CatalogResult<Vec<Tracking>> {
        let sql = format!(
            "SELECT {} FROM tracking WHERE status = ?1 ORDER BY updated_at DESC",
            COLUMNS
        );
        let mut stmt = self.catalog.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params![status], row_to_tracking)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete(&self, id: i64) -> CatalogResult<bool> {
        let deleted = self
            .catalog
            .conn()
            .execute("DELETE FROM tracking WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl KeyedStore for TrackingStore<'_> {
    type Entity = Tracking;
    const ENTITY: &'static str = "tracking";

    fn id_by_key(&self, candidate: &Tracking) -> CatalogResult<Option<i64>> {
        self.id_by_sheet(candidate.sheet_ref)
    }

    fn single_by_key(&self, candidate: &Tracking) -> CatalogResult<Option<Tracking>> {
        self.single_by_sheet(candidate.sheet_ref)
    }

    fn insert_row(&self, value: &Tracking) -> CatalogResult<i64> {
        let conn = self.catalog.conn();
        conn.execute(
            "INSERT INTO tracking (sheet_ref, status, episodes_seen, note, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![value.sheet_ref, value.status, value.episodes_seen, value.note, value.updated_at],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(&self, id: i64, value: &Tracking) -> CatalogResult<usize> {
        Ok(self.catalog.conn().execute(
            "UPDATE tracking SET sheet_ref = ?1, status = ?2, episodes_seen = ?3, note = ?4, updated_at = ?5
             WHERE id = ?6",
            params![value.sheet_ref, value.status, value.episodes_seen, value.note, value.updated_at, id],
        )?)
    }
}

/// Helper: Convert a database row to a Tracking entry
fn row_to_tracking(row: &Row) -> rusqlite::Result<Tracking> {
    Ok(Tracking {
        id: row.get(0)?,
        sheet_ref: row.get(1)?,
        status: row.get(2)?,
        episodes_seen: row.get(3)?,
        note: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::temp_catalog;
    use crate::enums::Section;
    use crate::models::Sheet;
    use anyhow::Result;

    #[test]
    fn test_one_entry_per_sheet() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let sheet_id = catalog.sheets().insert(&mut Sheet::new(
            Section::Anime,
            "https://anime.example.org/anime/1/One.html",
            "One",
        ))?;

        let mut entry = Tracking::new(sheet_id, WatchStatus::Watching);
        entry.episodes_seen = Some(3);
        let id = catalog.tracking().add_or_update(&mut entry)?;

        let mut later = Tracking::new(sheet_id, WatchStatus::Completed);
        later.episodes_seen = Some(24);
        assert_eq!(catalog.tracking().add_or_update(&mut later)?, id);

        assert_eq!(catalog.tracking().count()?, 1);
        assert_eq!(catalog.tracking().count_by_status(WatchStatus::Completed)?, 1);
        let stored = catalog.tracking().single_by_sheet(sheet_id)?.expect("stored");
        assert_eq!(stored.episodes_seen, Some(24));
        Ok(())
    }

    #[test]
    fn test_unknown_status_wire_value_reads_as_not_planned() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let sheet_id = catalog.sheets().insert(&mut Sheet::new(
            Section::Anime,
            "https://anime.example.org/anime/1/One.html",
            "One",
        ))?;
        catalog.tracking().insert(&mut Tracking::new(sheet_id, WatchStatus::Planned))?;
        catalog
            .conn()
            .execute("UPDATE tracking SET status = 77", [])?;

        let stored = catalog.tracking().single_by_sheet(sheet_id)?.expect("stored");
        assert_eq!(stored.status, WatchStatus::NotPlanned);
        assert_eq!(catalog.tracking().select_by_status(WatchStatus::Planned)?.len(), 0);
        Ok(())
    }
}
