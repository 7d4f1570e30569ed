//! Listing pages: one row per sheet link.

use crate::extract::{absolute_url, selector, site_id_from_url, text_of};
use catalog::{Section, SheetIndex};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

static ROW_LINK: Lazy<Selector> = Lazy::new(|| selector(".liste_fiches .fiche_item a.titre"));

/// Index rows of one listing page, in document order
///
/// Rows without a name or a usable link are dropped.
pub fn parse_listing(document: &Html, base: &Url, section: Section, page: u32) -> Vec<SheetIndex> {
    let mut rows = Vec::new();

    for link in document.select(&ROW_LINK) {
        let name = text_of(link);
        let url = link
            .value()
            .attr("href")
            .and_then(|href| absolute_url(base, href));

        match (name, url) {
            (Some(name), Some(url)) => {
                let mut row = SheetIndex::new(section, url, name);
                row.site_id = site_id_from_url(&row.url);
                row.page = Some(page);
                rows.push(row);
            }
            (name, url) => {
                debug!(page, ?name, ?url, "Skipping incomplete listing row");
            }
        }
    }

    rows
}
