//! Parsers for the site's page templates.
//!
//! Parsers are synchronous and take an already parsed document; the base
//! URL resolves relative links.

pub mod category;
pub mod contact;
pub mod listing;
pub mod sheet;

pub use category::parse_categories;
pub use contact::parse_contact;
pub use listing::parse_listing;
pub use sheet::{parse_sheet, ScrapedContact, ScrapedSheet};
