//! Listing rows, keyed by URL.

use super::{trim_in_place, Keyed, KeyedStore, Page};
use crate::bulk::{write_bulk_chunked, BulkReport, BulkRow, InsertMode};
use crate::context::Catalog;
use crate::enums::{CatalogEnum, Section, SortOrder};
use crate::error::CatalogResult;
use crate::models::SheetIndex;
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};

const COLUMNS: &str = "id, url, site_id, section, name, page";

impl Keyed for SheetIndex {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn key_label(&self) -> String {
        self.url.clone()
    }

    fn validate(&self) -> CatalogResult<()> {
        SheetIndex::validate(self)
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.url);
        trim_in_place(&mut self.name);
    }
}

impl BulkRow for SheetIndex {
    const TABLE: &'static str = "sheet_index";
    const COLUMNS: &'static [&'static str] = &["url", "site_id", "section", "name", "page"];
    const CONFLICT_KEY: &'static [&'static str] = &["url"];

    fn check(&self) -> CatalogResult<()> {
        SheetIndex::validate(self)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.url)
    }

    fn values(&self) -> CatalogResult<Vec<Value>> {
        Ok(vec![
            Value::from(self.url.trim().to_string()),
            Value::from(self.site_id),
            Value::from(i64::from(self.section.wire())),
            Value::from(self.name.trim().to_string()),
            Value::from(self.page.map(i64::from)),
        ])
    }
}

pub struct SheetIndexStore<'a> {
    catalog: &'a Catalog,
}

impl<'a> SheetIndexStore<'a> {
    pub(crate) fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn count(&self) -> CatalogResult<i64> {
        Ok(self
            .catalog
            .conn()
            .query_row("SELECT COUNT(*) FROM sheet_index", [], |row| row.get(0))?)
    }

    pub fn count_by_section(&self, section: Section) -> CatalogResult<i64> {
        Ok(self.catalog.conn().query_row(
            "SELECT COUNT(*) FROM sheet_index WHERE section = ?1",
            params![section],
            |row| row.get(0),
        )?)
    }

    pub fn id_by_url(&self, url: &str) -> CatalogResult<Option<i64>> {
        Ok(self
            .catalog
            .conn()
            .query_row(
                "SELECT id FROM sheet_index WHERE url = ?1",
                params![url.trim()],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn exists_by_url(&self, url: &str) -> CatalogResult<bool> {
        Ok(self.id_by_url(url)?.is_some())
    }

    pub fn single(&self, id: i64) -> CatalogResult<Option<SheetIndex>> {
        let sql = format!("SELECT {} FROM sheet_index WHERE id = ?1", COLUMNS);
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![id], row_to_index)
            .optional()?)
    }

    pub fn single_by_url(&self, url: &str) -> CatalogResult<Option<SheetIndex>> {
        let sql = format!("SELECT {} FROM sheet_index WHERE url = ?1", COLUMNS);
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![url.trim()], row_to_index)
            .optional()?)
    }

    /// Rows of a section in listing order (page, then insertion)
    pub fn select_by_section(&self, section: Section, page: Page) -> CatalogResult<Vec<SheetIndex>> {
        let sql = format!(
            "SELECT {} FROM sheet_index WHERE section = ?1 ORDER BY page ASC, id ASC{}",
            COLUMNS,
            page.sql()
        );
        let mut stmt = self.catalog.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params![section], row_to_index)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Rows of a section ordered by name
    pub fn select_by_name(
        &self,
        section: Section,
        order: SortOrder,
        page: Page,
    ) -> CatalogResult<Vec<SheetIndex>> {
        let sql = format!(
            "SELECT {} FROM sheet_index WHERE section = ?1 ORDER BY name {}{}",
            COLUMNS,
            order.sql(),
            page.sql()
        );
        let mut stmt = self.catalog.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params![section], row_to_index)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Indexed rows of a section with no stored sheet yet
    pub fn select_unharvested(&self, section: Section, page: Page) -> CatalogResult<Vec<SheetIndex>> {
        let sql = format!(
            "SELECT i.id, i.url, i.site_id, i.section, i.name, i.page
             FROM sheet_index i
             WHERE i.section = ?1 AND NOT EXISTS (SELECT 1 FROM sheet s WHERE s.url = i.url)
             ORDER BY i.page ASC, i.id ASC{}",
            page.sql()
        );
        let mut stmt = self.catalog.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params![section], row_to_index)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Write many rows, one multi-row statement per chunk
    pub fn insert_bulk(&self, rows: &[SheetIndex], mode: InsertMode) -> BulkReport {
        write_bulk_chunked(self.catalog.conn(), rows, mode)
    }

    pub fn delete(&self, id: i64) -> CatalogResult<bool> {
        let deleted = self
            .catalog
            .conn()
            .execute("DELETE FROM sheet_index WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Drop every row of a section before a full re-index
    pub fn delete_section(&self, section: Section) -> CatalogResult<usize> {
        Ok(self
            .catalog
            .conn()
            .execute("DELETE FROM sheet_index WHERE section = ?1", params![section])?)
    }
}

impl KeyedStore for SheetIndexStore<'_> {
    type Entity = SheetIndex;
    const ENTITY: &'static str = "sheet index";

    fn id_by_key(&self, candidate: &SheetIndex) -> CatalogResult<Option<i64>> {
        self.id_by_url(&candidate.url)
    }

    fn single_by_key(&self, candidate: &SheetIndex) -> CatalogResult<Option<SheetIndex>> {
        self.single_by_url(&candidate.url)
    }

    fn insert_row(&self, value: &SheetIndex) -> CatalogResult<i64> {
        let conn = self.catalog.conn();
        conn.execute(
            "INSERT INTO sheet_index (url, site_id, section, name, page) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![value.url.trim(), value.site_id, value.section, value.name.trim(), value.page],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(&self, id: i64, value: &SheetIndex) -> CatalogResult<usize> {
        Ok(self.catalog.conn().execute(
            "UPDATE sheet_index SET url = ?1, site_id = ?2, section = ?3, name = ?4, page = ?5 WHERE id = ?6",
            params![value.url.trim(), value.site_id, value.section, value.name.trim(), value.page, id],
        )?)
    }
}

/// Helper: Convert a database row to a SheetIndex
fn row_to_index(row: &Row) -> rusqlite::Result<SheetIndex> {
    Ok(SheetIndex {
        id: row.get(0)?,
        url: row.get(1)?,
        site_id: row.get(2)?,
        section: row.get(3)?,
        name: row.get(4)?,
        page: row.get(5)?,
    })
}
