//! Contact rows, keyed by URL.

use super::{trim_in_place, Keyed, KeyedStore, Page};
use crate::context::Catalog;
use crate::enums::{ContactType, SortOrder};
use crate::error::CatalogResult;
use crate::models::Contact;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

const COLUMNS: &str = "id, url, site_id, name, contact_type, description, thumbnail_url";

impl Keyed for Contact {
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
        Contact::validate(self)
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.url);
        trim_in_place(&mut self.name);
    }
}

pub struct ContactStore<'a> {
    catalog: &'a Catalog,
}

impl<'a> ContactStore<'a> {
    pub(crate) fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn count(&self) -> CatalogResult<i64> {
        Ok(self
            .catalog
            .conn()
            .query_row("SELECT COUNT(*) FROM contact", [], |row| row.get(0))?)
    }

    pub fn exists(&self, id: i64) -> CatalogResult<bool> {
        let found: Option<i64> = self
            .catalog
            .conn()
            .query_row("SELECT 1 FROM contact WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn id_by_url(&self, url: &str) -> CatalogResult<Option<i64>> {
        Ok(self
            .catalog
            .conn()
            .query_row(
                "SELECT id FROM contact WHERE url = ?1 LIMIT 1",
                params![url.trim()],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn exists_by_url(&self, url: &str) -> CatalogResult<bool> {
        Ok(self.id_by_url(url)?.is_some())
    }

    pub fn single(&self, id: i64) -> CatalogResult<Option<Contact>> {
        let sql = format!("SELECT {} FROM contact WHERE id = ?1", COLUMNS);
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![id], row_to_contact)
            .optional()?)
    }

    pub fn single_by_url(&self, url: &str) -> CatalogResult<Option<Contact>> {
        let sql = format!("SELECT {} FROM contact WHERE url = ?1 LIMIT 1", COLUMNS);
        Ok(self
            .catalog
            .conn()
            .query_row(&sql, params![url.trim()], row_to_contact)
            .optional()?)
    }

    /// Contacts ordered by name, optionally of one type
    pub fn select(
        &self,
        contact_type: Option<ContactType>,
        order: SortOrder,
        page: Page,
    ) -> CatalogResult<Vec<Contact>> {
        let conn = self.catalog.conn();
        let filter = if contact_type.is_some() { "WHERE contact_type = ?1 " } else { "" };
        let sql = format!(
            "SELECT {} FROM contact {}ORDER BY name {}{}",
            COLUMNS,
            filter,
            order.sql(),
            page.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let contacts = match contact_type {
            Some(contact_type) => stmt
                .query_map(params![contact_type], row_to_contact)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], row_to_contact)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(contacts)
    }

    /// Delete a contact and its sheet links
    pub fn delete(&self, id: i64) -> CatalogResult<bool> {
        let conn = self.catalog.conn();
        let links = conn.execute("DELETE FROM sheet_contact WHERE contact_id = ?1", params![id])?;
        let deleted = conn.execute("DELETE FROM contact WHERE id = ?1", params![id])?;

        if deleted > 0 {
            info!(contact_id = id, links, "Deleted contact");
        }
        Ok(deleted > 0)
    }
}

impl KeyedStore for ContactStore<'_> {
    type Entity = Contact;
    const ENTITY: &'static str = "contact";

    fn id_by_key(&self, candidate: &Contact) -> CatalogResult<Option<i64>> {
        self.id_by_url(&candidate.url)
    }

    fn single_by_key(&self, candidate: &Contact) -> CatalogResult<Option<Contact>> {
        self.single_by_url(&candidate.url)
    }

    fn insert_row(&self, value: &Contact) -> CatalogResult<i64> {
        let conn = self.catalog.conn();
        conn.execute(
            "INSERT INTO contact (url, site_id, name, contact_type, description, thumbnail_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                value.url.trim(),
                value.site_id,
                value.name.trim(),
                value.contact_type,
                value.description,
                value.thumbnail_url,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_row(&self, id: i64, value: &Contact) -> CatalogResult<usize> {
        Ok(self.catalog.conn().execute(
            "UPDATE contact SET url = ?1, site_id = ?2, name = ?3, contact_type = ?4,
                description = ?5, thumbnail_url = ?6
             WHERE id = ?7",
            params![
                value.url.trim(),
                value.site_id,
                value.name.trim(),
                value.contact_type,
                value.description,
                value.thumbnail_url,
                id,
            ],
        )?)
    }
}

/// Helper: Convert a database row to a Contact
pub(crate) fn row_to_contact(row: &Row) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        url: row.get(1)?,
        site_id: row.get(2)?,
        name: row.get(3)?,
        contact_type: row.get(4)?,
        description: row.get(5)?,
        thumbnail_url: row.get(6)?,
    })
}
