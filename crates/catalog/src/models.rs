//! Data models for the catalog.
//!
//! Entities are built in memory from scraped text, validated, then written
//! through their store. `id` is `None` until the row exists.

use crate::enums::{CategoryType, ContactType, DiffusionState, Section, WatchStatus};
use crate::error::{CatalogError, CatalogResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Genre or theme of a section, keyed by (section, name, type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<i64>,
    pub section: Section,
    pub category_type: CategoryType,
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl Category {
    pub fn new(section: Section, category_type: CategoryType, name: impl Into<String>) -> Self {
        Self {
            id: None,
            section,
            category_type,
            name: name.into(),
            url: None,
            description: None,
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        require("category name", &self.name)?;
        if let Some(url) = &self.url {
            validate_url(url)?;
        }
        Ok(())
    }
}

/// Studio, person or distributor sheet, keyed by URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Option<i64>,
    pub url: String,
    pub site_id: Option<i64>,
    pub name: String,
    pub contact_type: ContactType,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl Contact {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            site_id: None,
            name: name.into(),
            contact_type: ContactType::Unknown,
            description: None,
            thumbnail_url: None,
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        require("contact name", &self.name)?;
        validate_url(&self.url)?;
        validate_site_id(self.site_id)?;
        if let Some(url) = &self.thumbnail_url {
            validate_url(url)?;
        }
        Ok(())
    }
}

/// Detail page of an anime, manga, drama or novel, keyed by URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub id: Option<i64>,
    pub url: String,
    pub site_id: Option<i64>,
    pub section: Section,

    // Titles
    pub name: String,
    pub original_name: Option<String>,
    pub alternative_names: Vec<String>,

    pub description: Option<String>,
    pub thumbnail_url: Option<String>,

    // Dates
    pub release_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    pub episode_count: Option<u32>,
    pub episode_duration: Option<u32>, // minutes
    pub diffusion_state: DiffusionState,
    pub score: Option<f64>,

    // Content flags, filtered through ContentVisibility
    pub is_adult_content: bool,
    pub is_explicit_content: bool,

    pub fetched_at: DateTime<Utc>,
}

impl Sheet {
    pub fn new(section: Section, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            site_id: None,
            section,
            name: name.into(),
            original_name: None,
            alternative_names: Vec::new(),
            description: None,
            thumbnail_url: None,
            release_date: None,
            end_date: None,
            episode_count: None,
            episode_duration: None,
            diffusion_state: DiffusionState::Unknown,
            score: None,
            is_adult_content: false,
            is_explicit_content: false,
            fetched_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        require("sheet name", &self.name)?;
        validate_url(&self.url)?;
        validate_site_id(self.site_id)?;
        if let Some(url) = &self.thumbnail_url {
            validate_url(url)?;
        }
        if let Some(score) = self.score {
            if !(0.0..=10.0).contains(&score) {
                return Err(CatalogError::validation(format!(
                    "score {} is outside 0..=10",
                    score
                )));
            }
        }
        if let (Some(start), Some(end)) = (self.release_date, self.end_date) {
            if end < start {
                return Err(CatalogError::validation(format!(
                    "end date {} precedes release date {}",
                    end, start
                )));
            }
        }
        Ok(())
    }
}

/// Row of a section listing, keyed by URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetIndex {
    pub id: Option<i64>,
    pub url: String,
    pub site_id: Option<i64>,
    pub section: Section,
    pub name: String,
    /// Listing page the row was found on (audit only)
    pub page: Option<u32>,
}

impl SheetIndex {
    pub fn new(section: Section, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            site_id: None,
            section,
            name: name.into(),
            page: None,
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        require("index name", &self.name)?;
        validate_url(&self.url)?;
        validate_site_id(self.site_id)?;
        if self.page == Some(0) {
            return Err(CatalogError::validation("page numbers start at 1"));
        }
        Ok(())
    }
}

/// Personal watch entry of a stored sheet, one per sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracking {
    pub id: Option<i64>,
    /// Local id of the tracked sheet
    pub sheet_ref: i64,
    pub status: WatchStatus,
    pub episodes_seen: Option<u32>,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Upper bound accepted for a watched episode counter
pub const MAX_EPISODES_SEEN: u32 = 10_000;

impl Tracking {
    pub fn new(sheet_ref: i64, status: WatchStatus) -> Self {
        Self {
            id: None,
            sheet_ref,
            status,
            episodes_seen: None,
            note: None,
            updated_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        if self.sheet_ref <= 0 {
            return Err(CatalogError::validation("tracking needs a stored sheet"));
        }
        if self.episodes_seen.is_some_and(|n| n > MAX_EPISODES_SEEN) {
            return Err(CatalogError::validation(format!(
                "episodes seen must not exceed {}",
                MAX_EPISODES_SEEN
            )));
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> CatalogResult<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_site_id(site_id: Option<i64>) -> CatalogResult<()> {
    match site_id {
        Some(id) if id <= 0 => Err(CatalogError::validation(format!(
            "site id {} must be positive",
            id
        ))),
        _ => Ok(()),
    }
}

/// Accept absolute http(s) URLs with a host
pub fn validate_url(value: &str) -> CatalogResult<()> {
    let parsed = Url::parse(value.trim())
        .map_err(|e| CatalogError::validation(format!("malformed URL {:?}: {}", value, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(CatalogError::validation(format!(
            "URL {:?} is not an http(s) address",
            value
        )));
    }
    Ok(())
}
