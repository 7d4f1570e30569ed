//! Typed stores over the catalog tables.
//!
//! Each entity has a store with its keyed lookups and CRUD statements. The
//! insert/update decisions shared by all of them live in [`KeyedStore`].

pub mod category;
pub mod contact;
pub mod sheet;
pub mod sheet_index;
pub mod tracking;

pub use category::CategoryStore;
pub use contact::ContactStore;
pub use sheet::SheetStore;
pub use sheet_index::SheetIndexStore;
pub use tracking::TrackingStore;

use crate::error::{CatalogError, CatalogResult};
use tracing::{debug, info};

/// Entity with a local id and a natural key
pub trait Keyed {
    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);
    /// Natural key rendered for messages and logs
    fn key_label(&self) -> String;
    fn validate(&self) -> CatalogResult<()>;
    /// Trim the key and name fields to the form they are stored in
    fn normalize(&mut self) {}
}

/// Upsert gateway over a natural key
///
/// Implementors provide the raw statements; the provided methods make the
/// insert-or-update decisions and guarantee a natural key never maps to two
/// rows.
pub trait KeyedStore {
    type Entity: Keyed;

    /// Entity name used in messages
    const ENTITY: &'static str;

    /// Id of the row sharing the candidate's natural key
    fn id_by_key(&self, candidate: &Self::Entity) -> CatalogResult<Option<i64>>;

    /// Stored row sharing the candidate's natural key
    fn single_by_key(&self, candidate: &Self::Entity) -> CatalogResult<Option<Self::Entity>>;

    /// Raw insert, returns the new id
    fn insert_row(&self, value: &Self::Entity) -> CatalogResult<i64>;

    /// Raw update of row `id`, returns the number of changed rows
    fn update_row(&self, id: i64, value: &Self::Entity) -> CatalogResult<usize>;

    /// Validate, reject an existing natural key, then insert
    fn insert(&self, value: &mut Self::Entity) -> CatalogResult<i64> {
        value.normalize();
        value.validate()?;

        if let Some(existing) = self.id_by_key(value)? {
            return Err(CatalogError::duplicate(format!(
                "{} {} already exists with id {}",
                Self::ENTITY,
                value.key_label(),
                existing
            )));
        }

        let id = self.insert_row(value)?;
        value.set_id(id);
        debug!(entity = Self::ENTITY, id, key = %value.key_label(), "Inserted row");
        Ok(id)
    }

    /// Validate, refuse to take another row's natural key, then update
    fn update(&self, value: &Self::Entity) -> CatalogResult<()> {
        value.validate()?;

        let id = value.id().ok_or_else(|| {
            CatalogError::validation(format!(
                "{} {} has no id to update",
                Self::ENTITY,
                value.key_label()
            ))
        })?;

        if let Some(other) = self.id_by_key(value)? {
            if other != id {
                return Err(CatalogError::duplicate(format!(
                    "{} {} is already used by id {}",
                    Self::ENTITY,
                    value.key_label(),
                    other
                )));
            }
        }

        if self.update_row(id, value)? == 0 {
            return Err(CatalogError::NotFound(format!("{} with id {}", Self::ENTITY, id)));
        }

        debug!(entity = Self::ENTITY, id, key = %value.key_label(), "Updated row");
        Ok(())
    }

    /// Insert a new natural key or overwrite the row that holds it
    fn add_or_update(&self, value: &mut Self::Entity) -> CatalogResult<i64> {
        value.normalize();
        value.validate()?;

        match (value.id(), self.id_by_key(value)?) {
            (Some(id), Some(existing)) if id != existing => Err(CatalogError::duplicate(format!(
                "{} {} belongs to id {}, not {}",
                Self::ENTITY,
                value.key_label(),
                existing,
                id
            ))),
            (_, Some(existing)) => {
                value.set_id(existing);
                self.update(value)?;
                Ok(existing)
            }
            (Some(id), None) => {
                self.update(value)?;
                Ok(id)
            }
            (None, None) => {
                let id = self.insert(value)?;
                info!(entity = Self::ENTITY, id, key = %value.key_label(), "Added new row");
                Ok(id)
            }
        }
    }

    /// Resolve a candidate against storage
    ///
    /// With `reload_if_exist` the stored row replaces the candidate; without
    /// it the candidate only adopts the stored id. Unknown keys are inserted.
    fn single_or_create(
        &self,
        mut candidate: Self::Entity,
        reload_if_exist: bool,
    ) -> CatalogResult<Self::Entity> {
        candidate.normalize();
        if reload_if_exist {
            if let Some(stored) = self.single_by_key(&candidate)? {
                return Ok(stored);
            }
        } else if let Some(id) = self.id_by_key(&candidate)? {
            candidate.set_id(id);
            return Ok(candidate);
        }

        self.insert(&mut candidate)?;
        Ok(candidate)
    }
}

pub(crate) fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// `LIMIT`/`OFFSET` clause of listing queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub(crate) fn sql(self) -> String {
        match self.limit {
            Some(limit) => format!(" LIMIT {} OFFSET {}", limit, self.offset),
            None if self.offset > 0 => format!(" LIMIT -1 OFFSET {}", self.offset),
            None => String::new(),
        }
    }
}
