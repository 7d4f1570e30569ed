//! Sheet rows, keyed by URL.

use super::{trim_in_place, Keyed, KeyedStore, Page};
use crate::context::{Catalog, ContentVisibility};
use crate::enums::{Section, SortOrder};
use crate::error::CatalogResult;
use crate::models::Sheet;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

const COLUMNS: &str = "id, url, site_id, section, name, original_name, alternative_names, \
    description, thumbnail_url, release_date, end_date, episode_count, episode_duration, \
    diffusion_state, score, is_adult_content, is_explicit_content, fetched_at";

impl Keyed for Sheet {
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
        Sheet::validate(self)
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.url);
        trim_in_place(&mut self.name);
    }
}

pub struct SheetStore<'a> {
    catalog: &'a Catalog,
}

impl<'a> SheetStore<'a> {
    pub(crate) fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Number of visible sheets
    pub fn count(&self) -> CatalogResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM sheet WHERE {}",
            visibility_clause(self.catalog.visibility())
        );
        Ok(self.catalog.conn().query_row(&sql, [], |row| row.get(0))?)
    }

    /// Number of visible sheets in a section
    pub fn count_by_section(&self, section: Section) -> CatalogResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM sheet WHERE section = ?1 AND {}",
            visibility_clause(self.catalog.visibility())
        );
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![section], |row| row.get(0))?)
    }

    pub fn exists(&self, id: i64) -> CatalogResult<bool> {
        let found: Option<i64> = self
            .catalog
            .conn()
            .query_row("SELECT 1 FROM sheet WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn exists_by_url(&self, url: &str) -> CatalogResult<bool> {
        Ok(self.id_by_url(url)?.is_some())
    }

    pub fn id_by_url(&self, url: &str) -> CatalogResult<Option<i64>> {
        Ok(self
            .catalog
            .conn()
            .query_row(
                "SELECT id FROM sheet WHERE url = ?1 LIMIT 1",
                params![url.trim()],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn single(&self, id: i64) -> CatalogResult<Option<Sheet>> {
        let sql = format!("SELECT {} FROM sheet WHERE id = ?1", COLUMNS);
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![id], row_to_sheet)
            .optional()?)
    }

    pub fn single_by_url(&self, url: &str) -> CatalogResult<Option<Sheet>> {
        let sql = format!("SELECT {} FROM sheet WHERE url = ?1 LIMIT 1", COLUMNS);
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![url.trim()], row_to_sheet)
            .optional()?)
    }

    /// Visible sheets ordered by name
    pub fn select(&self, order: SortOrder, page: Page) -> CatalogResult<Vec<Sheet>> {
        let sql = format!(
            "SELECT {} FROM sheet WHERE {} ORDER BY name {}{}",
            COLUMNS,
            visibility_clause(self.catalog.visibility()),
            order.sql(),
            page.sql()
        );
        let mut stmt = self.catalog.conn().prepare(&sql)?;
        let sheets = stmt
            .query_map([], row_to_sheet)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sheets)
    }

    /// Visible sheets of a section ordered by name
    pub fn select_by_section(
        &self,
        section: Section,
        order: SortOrder,
        page: Page,
    ) -> CatalogResult<Vec<Sheet>> {
        let sql = format!(
            "SELECT {} FROM sheet WHERE section = ?1 AND {} ORDER BY name {}{}",
            COLUMNS,
            visibility_clause(self.catalog.visibility()),
            order.sql(),
            page.sql()
        );
        let mut stmt = self.catalog.conn().prepare(&sql)?;
        let sheets = stmt
            .query_map(params![section], row_to_sheet)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sheets)
    }

    /// Visible sheets whose name contains `fragment`
    pub fn search_by_name(&self, fragment: &str, page: Page) -> CatalogResult<Vec<Sheet>> {
        let sql = format!(
            "SELECT {} FROM sheet WHERE (name LIKE ?1 OR original_name LIKE ?1) AND {} ORDER BY name ASC{}",
            COLUMNS,
            visibility_clause(self.catalog.visibility()),
            page.sql()
        );
        let pattern = format!("%{}%", fragment.trim());
        let mut stmt = self.catalog.conn().prepare(&sql)?;
        let sheets = stmt
            .query_map(params![pattern], row_to_sheet)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sheets)
    }

    /// Delete a sheet with its links and tracking entry
    pub fn delete(&self, id: i64) -> CatalogResult<bool> {
        let conn = self.catalog.conn();
        let categories = conn.execute("DELETE FROM sheet_category WHERE sheet_id = ?1", params![id])?;
        let contacts = conn.execute("DELETE FROM sheet_contact WHERE sheet_id = ?1", params![id])?;
        let tracking = conn.execute("DELETE FROM tracking WHERE sheet_ref = ?1", params![id])?;
        let deleted = conn.execute("DELETE FROM sheet WHERE id = ?1", params![id])?;

        if deleted > 0 {
            info!(
                sheet_id = id,
                categories,
                contacts,
                tracking,
                "Deleted sheet"
            );
        }
        Ok(deleted > 0)
    }
}

impl KeyedStore for SheetStore<'_> {
    type Entity = Sheet;
    const ENTITY: &'static str = "sheet";

    fn id_by_key(&self, candidate: &Sheet) -> CatalogResult<Option<i64>> {
        self.id_by_url(&candidate.url)
    }

    fn single_by_key(&self, candidate: &Sheet) -> CatalogResult<Option<Sheet>> {
        self.single_by_url(&candidate.url)
    }

    fn insert_row(&self, value: &Sheet) -> CatalogResult<i64> {
        let conn = self.catalog.conn();
        conn.execute(
            "INSERT INTO sheet (
                url, site_id, section, name, original_name, alternative_names,
                description, thumbnail_url, release_date, end_date,
                episode_count, episode_duration, diffusion_state, score,
                is_adult_content, is_explicit_content, fetched_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16, ?17
            )",
            params![
                value.url.trim(),
                value.site_id,
                value.section,
                value.name.trim(),
                value.original_name,
                serde_json::to_string(&value.alternative_names)?,
                value.description,
                value.thumbnail_url,
                value.release_date,
                value.end_date,
                value.episode_count,
                value.episode_duration,
                value.diffusion_state,
                value.score,
                value.is_adult_content,
                value.is_explicit_content,
                value.fetched_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(&self, id: i64, value: &Sheet) -> CatalogResult<usize> {
        Ok(self.catalog.conn().execute(
            "UPDATE sheet SET
                url = ?1, site_id = ?2, section = ?3, name = ?4, original_name = ?5,
                alternative_names = ?6, description = ?7, thumbnail_url = ?8,
                release_date = ?9, end_date = ?10, episode_count = ?11,
                episode_duration = ?12, diffusion_state = ?13, score = ?14,
                is_adult_content = ?15, is_explicit_content = ?16, fetched_at = ?17
             WHERE id = ?18",
            params![
                value.url.trim(),
                value.site_id,
                value.section,
                value.name.trim(),
                value.original_name,
                serde_json::to_string(&value.alternative_names)?,
                value.description,
                value.thumbnail_url,
                value.release_date,
                value.end_date,
                value.episode_count,
                value.episode_duration,
                value.diffusion_state,
                value.score,
                value.is_adult_content,
                value.is_explicit_content,
                value.fetched_at,
                id,
            ],
        )?)
    }
}

fn visibility_clause(visibility: ContentVisibility) -> String {
    format!(
        "(is_adult_content = 0 OR {}) AND (is_explicit_content = 0 OR {})",
        i32::from(visibility.include_adult),
        i32::from(visibility.include_explicit)
    )
}

/// Helper: Convert a database row to a Sheet
pub(crate) fn row_to_sheet(row: &Row) -> rusqlite::Result<Sheet> {
    let alternative_names: String = row.get(6)?;
    Ok(Sheet {
        id: row.get(0)?,
        url: row.get(1)?,
        site_id: row.get(2)?,
        section: row.get(3)?,
        name: row.get(4)?,
        original_name: row.get(5)?,
        alternative_names: serde_json::from_str(&alternative_names).unwrap_or_default(),
        description: row.get(7)?,
        thumbnail_url: row.get(8)?,
        release_date: row.get(9)?,
        end_date: row.get(10)?,
        episode_count: row.get(11)?,
        episode_duration: row.get(12)?,
        diffusion_state: row.get(13)?,
        score: row.get(14)?,
        is_adult_content: row.get(15)?,
        is_explicit_content: row.get(16)?,
        fetched_at: row.get(17)?,
    })
}
