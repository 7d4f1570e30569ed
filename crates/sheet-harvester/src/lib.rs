//! Sheet harvester for the cataloging site.
//!
//! This library walks the site's paginated listings, parses sheet,
//! category and contact pages, and stores the results through the
//! `catalog` crate.

pub mod error;
pub mod extract;
pub mod fetch;
pub mod harvester;
pub mod pages;
pub mod pagination;
pub mod site;

pub use error::{FetchError, HarvestError, HarvestResult};
pub use fetch::{HttpFetcher, MemoryFetcher, Pacer, PageFetcher};
pub use harvester::{HarvestStats, SheetHarvester};
pub use pagination::{discover_page_range, PageRange, PaginationWalker};
pub use site::{PageTemplate, SiteLayout};
