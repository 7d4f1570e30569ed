//! Category rows, keyed by (section, name, type).

use super::{trim_in_place, Keyed, KeyedStore, Page};
use crate::bulk::{write_bulk_chunked, BulkReport, BulkRow, InsertMode};
use crate::context::Catalog;
use crate::enums::{CatalogEnum, CategoryType, Section, SortOrder};
use crate::error::CatalogResult;
use crate::models::Category;
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

const COLUMNS: &str = "id, section, category_type, name, url, description";

impl Keyed for Category {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn key_label(&self) -> String {
        format!("{}/{}/{}", self.section, self.category_type, self.name)
    }

    fn validate(&self) -> CatalogResult<()> {
        Category::validate(self)
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.name);
    }
}

impl BulkRow for Category {
    const TABLE: &'static str = "category";
    const COLUMNS: &'static [&'static str] =
        &["section", "category_type", "name", "url", "description"];
    const CONFLICT_KEY: &'static [&'static str] = &["section", "name", "category_type"];

    fn check(&self) -> CatalogResult<()> {
        Category::validate(self)
    }

    fn describe(&self) -> String {
        self.key_label()
    }

    fn values(&self) -> CatalogResult<Vec<Value>> {
        Ok(vec![
            Value::from(i64::from(self.section.wire())),
            Value::from(i64::from(self.category_type.wire())),
            Value::from(self.name.trim().to_string()),
            Value::from(self.url.clone()),
            Value::from(self.description.clone()),
        ])
    }
}

pub struct CategoryStore<'a> {
    catalog: &'a Catalog,
}

impl<'a> CategoryStore<'a> {
    pub(crate) fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn count(&self) -> CatalogResult<i64> {
        Ok(self
            .catalog
            .conn()
            .query_row("SELECT COUNT(*) FROM category", [], |row| row.get(0))?)
    }

    pub fn count_by_section(&self, section: Section) -> CatalogResult<i64> {
        Ok(self.catalog.conn().query_row(
            "SELECT COUNT(*) FROM category WHERE section = ?1",
            params![section],
            |row| row.get(0),
        )?)
    }

    pub fn exists(&self, id: i64) -> CatalogResult<bool> {
        let found: Option<i64> = self
            .catalog
            .conn()
            .query_row("SELECT 1 FROM category WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn id_by_name(
        &self,
        section: Section,
        name: &str,
        category_type: CategoryType,
    ) -> CatalogResult<Option<i64>> {
        Ok(self
            .catalog
            .conn()
            .query_row(
                "SELECT id FROM category WHERE section = ?1 AND name = ?2 AND category_type = ?3",
                params![section, name.trim(), category_type],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn exists_by_name(
        &self,
        section: Section,
        name: &str,
        category_type: CategoryType,
    ) -> CatalogResult<bool> {
        Ok(self.id_by_name(section, name, category_type)?.is_some())
    }

    pub fn single(&self, id: i64) -> CatalogResult<Option<Category>> {
        let sql = format!("SELECT {} FROM category WHERE id = ?1", COLUMNS);
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![id], row_to_category)
            .optional()?)
    }

    pub fn single_by_name(
        &self,
        section: Section,
        name: &str,
        category_type: CategoryType,
    ) -> CatalogResult<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM category WHERE section = ?1 AND name = ?2 AND category_type = ?3",
            COLUMNS
        );
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![section, name.trim(), category_type], row_to_category)
            .optional()?)
    }

    /// Categories of a section, optionally of one type, ordered by name
    pub fn select(
        &self,
        section: Section,
        category_type: Option<CategoryType>,
        order: SortOrder,
        page: Page,
    ) -> CatalogResult<Vec<Category>> {
        let conn = self.catalog.conn();
        let filter = if category_type.is_some() { "AND category_type = ?2 " } else { "" };
        let sql = format!(
            "SELECT {} FROM category WHERE section = ?1 {}ORDER BY name {}{}",
            COLUMNS,
            filter,
            order.sql(),
            page.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let categories = match category_type {
            Some(category_type) => stmt
                .query_map(params![section, category_type], row_to_category)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![section], row_to_category)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(categories)
    }

    /// Write many categories, one multi-row statement per chunk
    pub fn insert_bulk(&self, categories: &[Category], mode: InsertMode) -> BulkReport {
        write_bulk_chunked(self.catalog.conn(), categories, mode)
    }

    /// Delete a category and its sheet links
    pub fn delete(&self, id: i64) -> CatalogResult<bool> {
        let conn = self.catalog.conn();
        let links = conn.execute("DELETE FROM sheet_category WHERE category_id = ?1", params![id])?;
        let deleted = conn.execute("DELETE FROM category WHERE id = ?1", params![id])?;

        if deleted > 0 {
            info!(category_id = id, links, "Deleted category");
        }
        Ok(deleted > 0)
    }
}

impl KeyedStore for CategoryStore<'_> {
    type Entity = Category;
    const ENTITY: &'static str = "category";

    fn id_by_key(&self, candidate: &Category) -> CatalogResult<Option<i64>> {
        self.id_by_name(candidate.section, &candidate.name, candidate.category_type)
    }

    fn single_by_key(&self, candidate: &Category) -> CatalogResult<Option<Category>> {
        self.single_by_name(candidate.section, &candidate.name, candidate.category_type)
    }

    fn insert_row(&self, value: &Category) -> CatalogResult<i64> {
        let conn = self.catalog.conn();
        conn.execute(
            "INSERT INTO category (section, category_type, name, url, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                value.section,
                value.category_type,
                value.name.trim(),
                value.url,
                value.description,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(&self, id: i64, value: &Category) -> CatalogResult<usize> {
        Ok(self.catalog.conn().execute(
            "UPDATE category SET section = ?1, category_type = ?2, name = ?3, url = ?4, description = ?5
             WHERE id = ?6",
            params![
                value.section,
                value.category_type,
                value.name.trim(),
                value.url,
                value.description,
                id,
            ],
        )?)
    }
}

/// Helper: Convert a database row to a Category
pub(crate) fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        section: row.get(1)?,
        category_type: row.get(2)?,
        name: row.get(3)?,
        url: row.get(4)?,
        description: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::temp_catalog;
    use anyhow::Result;

    #[test]
    fn test_same_name_different_type_are_distinct() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let store = catalog.categories();

        let genre = store.add_or_update(&mut Category::new(Section::Anime, CategoryType::Genre, "Action"))?;
        let theme = store.add_or_update(&mut Category::new(Section::Anime, CategoryType::Theme, "Action"))?;
        let manga = store.add_or_update(&mut Category::new(Section::Manga, CategoryType::Genre, "Action"))?;

        assert_ne!(genre, theme);
        assert_ne!(genre, manga);
        assert_eq!(store.count()?, 3);

        let again = store.add_or_update(&mut Category::new(Section::Anime, CategoryType::Genre, "Action"))?;
        assert_eq!(again, genre);
        assert_eq!(store.count()?, 3);
        Ok(())
    }

    #[test]
    fn test_select_filters_by_type() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let rows = vec![
            Category::new(Section::Anime, CategoryType::Genre, "Comédie"),
            Category::new(Section::Anime, CategoryType::Genre, "Action"),
            Category::new(Section::Anime, CategoryType::Theme, "École"),
        ];
        assert!(catalog.categories().insert_bulk(&rows, InsertMode::Insert).is_success());

        let genres = catalog.categories().select(
            Section::Anime,
            Some(CategoryType::Genre),
            SortOrder::Ascending,
            Page::all(),
        )?;
        let names: Vec<&str> = genres.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Action", "Comédie"]);

        let all = catalog
            .categories()
            .select(Section::Anime, None, SortOrder::Unknown, Page::all())?;
        assert_eq!(all.len(), 3);
        Ok(())
    }

    #[test]
    fn test_round_trip_by_key() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let mut category = Category::new(Section::Drama, CategoryType::Theme, "Voyage temporel");
        category.url = Some("https://drama.example.org/theme/42/Voyage-temporel.html".to_string());
        category.description = Some("Personnages voyageant dans le temps".to_string());

        catalog.categories().insert(&mut category)?;
        let stored = catalog
            .categories()
            .single_by_name(Section::Drama, "Voyage temporel", CategoryType::Theme)?
            .expect("stored");
        assert_eq!(stored, category);
        Ok(())
    }

    #[test]
    fn test_delete() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let id = catalog
            .categories()
            .insert(&mut Category::new(Section::Anime, CategoryType::Genre, "Horreur"))?;

        assert!(catalog.categories().exists(id)?);
        assert!(catalog.categories().delete(id)?);
        assert!(!catalog.categories().exists(id)?);
        Ok(())
    }
}
