//! Sheet associations with categories and contacts.
//!
//! Links are plain rows in `sheet_category` and `sheet_contact`; this service
//! takes the sheet id as a parameter instead of hanging methods off `Sheet`.

use crate::context::Catalog;
use crate::enums::ContactRole;
use crate::error::CatalogResult;
use crate::models::{Category, Contact};
use crate::store::category::row_to_category;
use crate::store::contact::row_to_contact;
use rusqlite::params;
use tracing::debug;

pub struct SheetLinks<'a> {
    catalog: &'a Catalog,
}

impl<'a> SheetLinks<'a> {
    pub(crate) fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Link a category; returns false when the link already existed
    pub fn link_category(&self, sheet_id: i64, category_id: i64) -> CatalogResult<bool> {
        let added = self.catalog.conn().execute(
            "INSERT OR IGNORE INTO sheet_category (sheet_id, category_id) VALUES (?1, ?2)",
            params![sheet_id, category_id],
        )?;
        Ok(added > 0)
    }

    pub fn unlink_categories(&self, sheet_id: i64) -> CatalogResult<usize> {
        Ok(self
            .catalog
            .conn()
            .execute("DELETE FROM sheet_category WHERE sheet_id = ?1", params![sheet_id])?)
    }

    /// Make `category_ids` the exact category set of a sheet
    pub fn replace_categories(&self, sheet_id: i64, category_ids: &[i64]) -> CatalogResult<usize> {
        let removed = self.unlink_categories(sheet_id)?;
        let mut added = 0;
        for &category_id in category_ids {
            if self.link_category(sheet_id, category_id)? {
                added += 1;
            }
        }
        debug!(sheet_id, removed, added, "Replaced sheet categories");
        Ok(added)
    }

    pub fn category_ids(&self, sheet_id: i64) -> CatalogResult<Vec<i64>> {
        let mut stmt = self.catalog.conn().prepare(
            "SELECT category_id FROM sheet_category WHERE sheet_id = ?1 ORDER BY category_id",
        )?;
        let ids = stmt
            .query_map(params![sheet_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn categories(&self, sheet_id: i64) -> CatalogResult<Vec<Category>> {
        let mut stmt = self.catalog.conn().prepare(
            "SELECT c.id, c.section, c.category_type, c.name, c.url, c.description
             FROM category c
             JOIN sheet_category sc ON sc.category_id = c.id
             WHERE sc.sheet_id = ?1
             ORDER BY c.category_type, c.name",
        )?;
        let categories = stmt
            .query_map(params![sheet_id], row_to_category)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Sheet ids linked to a category
    pub fn sheets_in_category(&self, category_id: i64) -> CatalogResult<Vec<i64>> {
        let mut stmt = self.catalog.conn().prepare(
            "SELECT sheet_id FROM sheet_category WHERE category_id = ?1 ORDER BY sheet_id",
        )?;
        let ids = stmt
            .query_map(params![category_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Link a contact in a role; returns false when the link already existed
    pub fn link_contact(&self, sheet_id: i64, contact_id: i64, role: ContactRole) -> CatalogResult<bool> {
        let added = self.catalog.conn().execute(
            "INSERT OR IGNORE INTO sheet_contact (sheet_id, contact_id, role) VALUES (?1, ?2, ?3)",
            params![sheet_id, contact_id, role],
        )?;
        Ok(added > 0)
    }

    pub fn unlink_contacts(&self, sheet_id: i64) -> CatalogResult<usize> {
        Ok(self
            .catalog
            .conn()
            .execute("DELETE FROM sheet_contact WHERE sheet_id = ?1", params![sheet_id])?)
    }

    /// Make `contacts` the exact contact set of a sheet
    pub fn replace_contacts(&self, sheet_id: i64, contacts: &[(i64, ContactRole)]) -> CatalogResult<usize> {
        let removed = self.unlink_contacts(sheet_id)?;
        let mut added = 0;
        for &(contact_id, role) in contacts {
            if self.link_contact(sheet_id, contact_id, role)? {
                added += 1;
            }
        }
        debug!(sheet_id, removed, added, "Replaced sheet contacts");
        Ok(added)
    }

    pub fn contacts(&self, sheet_id: i64) -> CatalogResult<Vec<(ContactRole, Contact)>> {
        let mut stmt = self.catalog.conn().prepare(
            "SELECT c.id, c.url, c.site_id, c.name, c.contact_type, c.description, c.thumbnail_url, sc.role
             FROM contact c
             JOIN sheet_contact sc ON sc.contact_id = c.id
             WHERE sc.sheet_id = ?1
             ORDER BY sc.role, c.name",
        )?;
        let contacts = stmt
            .query_map(params![sheet_id], |row| {
                let contact = row_to_contact(row)?;
                let role: ContactRole = row.get(7)?;
                Ok((role, contact))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use crate::context::test_support::temp_catalog;
    use crate::enums::{CategoryType, ContactRole, ContactType, Section};
    use crate::models::{Category, Contact, Sheet};
    use crate::store::KeyedStore;
    use anyhow::Result;

    #[test]
    fn test_links_and_cascades() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let sheet_id = catalog.sheets().insert(&mut Sheet::new(
            Section::Anime,
            "https://anime.example.org/anime/8910/Dr-STONE.html",
            "Dr.STONE",
        ))?;
        let action = catalog
            .categories()
            .insert(&mut Category::new(Section::Anime, CategoryType::Genre, "Action"))?;
        let science = catalog
            .categories()
            .insert(&mut Category::new(Section::Anime, CategoryType::Theme, "Science"))?;
        let mut studio = Contact::new("https://anime.example.org/studio/1/TMS.html", "TMS");
        studio.contact_type = ContactType::Studio;
        let studio_id = catalog.contacts().insert(&mut studio)?;

        let links = catalog.links();
        assert_eq!(links.replace_categories(sheet_id, &[action, science, action])?, 2);
        assert!(links.link_contact(sheet_id, studio_id, ContactRole::Studio)?);
        assert!(!links.link_contact(sheet_id, studio_id, ContactRole::Studio)?);

        let names: Vec<String> = links.categories(sheet_id)?.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Action", "Science"]);
        assert_eq!(links.sheets_in_category(science)?, vec![sheet_id]);

        let contacts = links.contacts(sheet_id)?;
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].0, ContactRole::Studio);
        assert_eq!(contacts[0].1.name, "TMS");

        // Deleting a category removes only its links
        assert!(catalog.categories().delete(science)?);
        assert_eq!(links.category_ids(sheet_id)?, vec![action]);

        // Deleting the sheet removes the rest
        assert!(catalog.sheets().delete(sheet_id)?);
        assert!(links.category_ids(sheet_id)?.is_empty());
        assert!(links.contacts(sheet_id)?.is_empty());
        assert!(catalog.contacts().exists(studio_id)?);
        Ok(())
    }

    #[test]
    fn test_contact_delete_removes_links() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let sheet_id = catalog.sheets().insert(&mut Sheet::new(
            Section::Manga,
            "https://manga.example.org/manga/1/One.html",
            "One",
        ))?;
        let author = catalog
            .contacts()
            .insert(&mut Contact::new("https://manga.example.org/contact/9/Author.html", "Author"))?;
        catalog.links().replace_contacts(sheet_id, &[(author, ContactRole::Author)])?;

        assert!(catalog.contacts().delete(author)?);
        assert!(catalog.links().contacts(sheet_id)?.is_empty());
        Ok(())
    }
}
