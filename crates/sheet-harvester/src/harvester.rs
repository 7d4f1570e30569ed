//! Harvest orchestrator.
//!
//! Ties fetching, page parsing and the catalog stores together. Every
//! operation takes the catalog context and a cancellation token; the token
//! is checked between pages and between sheets.

use crate::error::{FetchError, HarvestError, HarvestResult};
use crate::fetch::{Pacer, PageFetcher};
use crate::pages::{parse_categories, parse_contact, parse_listing, parse_sheet, ScrapedSheet};
use crate::pagination::PaginationWalker;
use crate::site::SiteLayout;
use catalog::config::SiteConfig;
use catalog::{
    BulkReport, Catalog, Contact, ContactRole, InsertMode, KeyedStore, Page, Section, Sheet,
    SheetIndex,
};
use scraper::Html;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

/// Statistics for a crawl over indexed sheets
#[derive(Debug, Clone, Default)]
pub struct HarvestStats {
    pub candidates: usize,
    pub harvested: usize,
    pub errors: usize,
}

pub struct SheetHarvester<F: PageFetcher> {
    fetcher: F,
    layout: SiteLayout,
    page_delay: Duration,
    prefetch: bool,
}

impl<F: PageFetcher> SheetHarvester<F> {
    pub fn new(fetcher: F, site: &SiteConfig) -> Self {
        Self {
            fetcher,
            layout: SiteLayout::from_config(site),
            page_delay: Duration::from_millis(site.page_delay_ms),
            prefetch: site.prefetch,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    fn walker(&self, cancel: &CancellationToken) -> PaginationWalker<'_, F> {
        PaginationWalker::new(&self.fetcher, self.page_delay, self.prefetch, cancel.clone())
    }

    /// Walk the section listing and bulk-write its rows
    ///
    /// Known URLs are overwritten in place and keep their row id.
    pub async fn harvest_index(
        &self,
        catalog: &Catalog,
        section: Section,
        cancel: &CancellationToken,
    ) -> HarvestResult<BulkReport> {
        info!(section = %section, "Harvesting section index");

        let base = self.layout.section_root(section)?;
        let rows = self
            .walker(cancel)
            .walk(&self.layout.listing(section), |document, page| {
                parse_listing(document, &base, section, page)
            })
            .await?;

        let report = catalog.sheet_index().insert_bulk(&rows, InsertMode::InsertOrReplace);
        info!(
            section = %section,
            found = rows.len(),
            affected = report.affected,
            skipped = report.skipped,
            "Section index harvested"
        );
        Ok(report)
    }

    /// Read the category page of a section and bulk-write its categories
    pub async fn harvest_categories(
        &self,
        catalog: &Catalog,
        section: Section,
        cancel: &CancellationToken,
    ) -> HarvestResult<BulkReport> {
        check_cancelled(cancel)?;
        let url = self.layout.categories_url(section)?;
        let body = self.fetcher.fetch(&url).await?;

        let categories = parse_categories(&Html::parse_document(&body), &url, section);
        let report = catalog
            .categories()
            .insert_bulk(&categories, InsertMode::InsertOrReplace);

        info!(
            section = %section,
            found = categories.len(),
            affected = report.affected,
            "Categories harvested"
        );
        Ok(report)
    }

    /// Fetch one sheet and store it with its categories, contacts and links
    ///
    /// With `reload_if_exist` a sheet already stored under that URL is
    /// returned as is, without a request.
    pub async fn harvest_sheet(
        &self,
        catalog: &Catalog,
        url: &str,
        reload_if_exist: bool,
        cancel: &CancellationToken,
    ) -> HarvestResult<Sheet> {
        check_cancelled(cancel)?;
        let url = Url::parse(url.trim()).map_err(|e| FetchError::invalid_url(url, e))?;

        if reload_if_exist {
            if let Some(stored) = catalog.sheets().single_by_url(url.as_str())? {
                info!(url = %url, sheet_id = ?stored.id, "Sheet already stored");
                return Ok(stored);
            }
        }

        let body = self.fetcher.fetch(&url).await?;
        let section = self.layout.section_of(&url);
        let scraped = parse_sheet(&Html::parse_document(&body), &url, section).ok_or_else(|| {
            HarvestError::MissingField {
                url: url.to_string(),
                field: "name",
            }
        })?;

        store_scraped(catalog, scraped)
    }

    /// Fetch a contact page and upsert the contact
    pub async fn harvest_contact(
        &self,
        catalog: &Catalog,
        url: &str,
        cancel: &CancellationToken,
    ) -> HarvestResult<Contact> {
        check_cancelled(cancel)?;
        let url = Url::parse(url.trim()).map_err(|e| FetchError::invalid_url(url, e))?;
        let body = self.fetcher.fetch(&url).await?;

        let mut contact = parse_contact(&Html::parse_document(&body), &url).ok_or_else(|| {
            HarvestError::MissingField {
                url: url.to_string(),
                field: "name",
            }
        })?;

        let contact_id = catalog.contacts().add_or_update(&mut contact)?;
        info!(contact_id, name = %contact.name, "Contact harvested");
        Ok(contact)
    }

    /// Most awaited sheets of a section, every page requested at once
    pub async fn harvest_most_awaited(
        &self,
        section: Section,
        cancel: &CancellationToken,
    ) -> HarvestResult<Vec<SheetIndex>> {
        info!(section = %section, "Harvesting most awaited listing");

        let base = self.layout.section_root(section)?;
        let rows = self
            .walker(cancel)
            .walk_concurrent(&self.layout.most_awaited(section), |document, page| {
                parse_listing(document, &base, section, page)
            })
            .await?;

        info!(section = %section, found = rows.len(), "Most awaited listing harvested");
        Ok(rows)
    }

    /// Harvest indexed sheets that are not stored yet, one after another
    ///
    /// A failing sheet is logged and counted; only cancellation stops the crawl.
    pub async fn harvest_indexed_sheets(
        &self,
        catalog: &Catalog,
        section: Section,
        limit: Option<u32>,
        cancel: &CancellationToken,
    ) -> HarvestResult<HarvestStats> {
        let page = limit.map(|limit| Page::new(limit, 0)).unwrap_or_else(Page::all);
        let pending = catalog.sheet_index().select_unharvested(section, page)?;

        let mut stats = HarvestStats {
            candidates: pending.len(),
            ..HarvestStats::default()
        };
        info!(section = %section, candidates = stats.candidates, "Crawling indexed sheets");

        let mut pacer = Pacer::new(self.page_delay);
        for (idx, row) in pending.iter().enumerate() {
            check_cancelled(cancel)?;
            pacer.acquire().await;

            match self.harvest_sheet(catalog, &row.url, false, cancel).await {
                Ok(sheet) => {
                    stats.harvested += 1;
                    info!(
                        progress = format!("{}/{}", idx + 1, stats.candidates),
                        name = %sheet.name,
                        "Sheet harvested"
                    );
                }
                Err(HarvestError::Cancelled) => return Err(HarvestError::Cancelled),
                Err(e) => {
                    stats.errors += 1;
                    error!(url = %row.url, error = %e, "Failed to harvest sheet");
                }
            }
        }

        info!(
            section = %section,
            harvested = stats.harvested,
            errors = stats.errors,
            "Crawl complete"
        );
        Ok(stats)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> HarvestResult<()> {
    if cancel.is_cancelled() {
        return Err(HarvestError::Cancelled);
    }
    Ok(())
}

/// Upsert a scraped sheet, then make its links match the page
///
/// A category or contact that cannot be stored is logged and left unlinked.
fn store_scraped(catalog: &Catalog, scraped: ScrapedSheet) -> HarvestResult<Sheet> {
    let ScrapedSheet {
        mut sheet,
        categories,
        contacts,
    } = scraped;

    let sheet_id = catalog.sheets().add_or_update(&mut sheet)?;

    let mut category_ids = Vec::with_capacity(categories.len());
    for category in categories {
        let name = category.name.clone();
        match catalog.categories().single_or_create(category, false) {
            Ok(stored) => category_ids.extend(stored.id),
            Err(e) => warn!(sheet_id, category = %name, error = %e, "Skipping category link"),
        }
    }

    let mut contact_links: Vec<(i64, ContactRole)> = Vec::with_capacity(contacts.len());
    for scraped_contact in contacts {
        let name = scraped_contact.contact.name.clone();
        match catalog.contacts().single_or_create(scraped_contact.contact, false) {
            Ok(stored) => contact_links.extend(stored.id.map(|id| (id, scraped_contact.role))),
            Err(e) => warn!(sheet_id, contact = %name, error = %e, "Skipping contact link"),
        }
    }

    let links = catalog.links();
    links.replace_categories(sheet_id, &category_ids)?;
    links.replace_contacts(sheet_id, &contact_links)?;

    info!(
        sheet_id,
        name = %sheet.name,
        categories = category_ids.len(),
        contacts = contact_links.len(),
        "Stored sheet"
    );
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use catalog::{CategoryType, ContentVisibility, Database, DiffusionState};
    use tempfile::TempDir;

    const ROOT: &str = "https://anime.example.org";

    fn site() -> SiteConfig {
        SiteConfig {
            base_url: "https://{section}.example.org".to_string(),
            page_delay_ms: 0,
            ..SiteConfig::default()
        }
    }

    fn temp_catalog() -> anyhow::Result<(TempDir, Catalog)> {
        let temp_dir = TempDir::new()?;
        let db = Database::open(temp_dir.path().join("catalog.db"))?;
        Ok((temp_dir, Catalog::new(db, ContentVisibility::default())))
    }

    fn listing(items: &[(u32, &str)], last: Option<u32>, path: &str) -> String {
        let rows: String = items
            .iter()
            .map(|(id, name)| {
                format!(
                    r#"<div class="fiche_item"><a class="titre" href="/anime/{}/{}.html">{}</a></div>"#,
                    id, name, name
                )
            })
            .collect();
        let pager = last
            .map(|last| {
                format!(
                    r#"<div class="pagination"><a class="first" href="/{path}/page-1.html">1</a><a class="last" href="/{path}/page-{last}.html">{last}</a></div>"#,
                )
            })
            .unwrap_or_default();
        format!(r#"<div class="liste_fiches">{}</div>{}"#, rows, pager)
    }

    fn sheet_page(name: &str, categories: &[&str]) -> String {
        let links: String = categories
            .iter()
            .enumerate()
            .map(|(i, c)| format!(r#"<a href="/genre/{}/{}.html">{}</a>"#, i + 1, c, c))
            .collect();
        format!(
            r#"<div id="fiche_entete"><h1>{}</h1></div>
               <span class="etat">En cours</span>
               <div class="categories">{}</div>
               <ul class="contacts"><li><span class="role">Studio</span> <a href="/studio/3/TMS.html">TMS</a></li></ul>"#,
            name, links
        )
    }

    #[tokio::test]
    async fn test_harvest_index_single_page() -> anyhow::Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let fetcher = MemoryFetcher::new().with_page(
            format!("{}/liste/page-1.html", ROOT),
            listing(&[(1, "One"), (2, "Two")], None, "liste"),
        );
        let harvester = SheetHarvester::new(fetcher, &site());

        let report = harvester
            .harvest_index(&catalog, Section::Anime, &CancellationToken::new())
            .await?;
        assert_eq!(report.affected, 2);
        assert_eq!(catalog.sheet_index().count_by_section(Section::Anime)?, 2);
        assert_eq!(harvester.fetcher().requests().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_harvest_index_twice_keeps_rows() -> anyhow::Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let fetcher = MemoryFetcher::new()
            .with_page(
                format!("{}/liste/page-1.html", ROOT),
                listing(&[(1, "One")], Some(2), "liste"),
            )
            .with_page(
                format!("{}/liste/page-2.html", ROOT),
                listing(&[(2, "Two")], Some(2), "liste"),
            );
        let harvester = SheetHarvester::new(fetcher, &site());
        let cancel = CancellationToken::new();

        harvester.harvest_index(&catalog, Section::Anime, &cancel).await?;
        let first_id = catalog
            .sheet_index()
            .id_by_url(&format!("{}/anime/2/Two.html", ROOT))?;
        harvester.harvest_index(&catalog, Section::Anime, &cancel).await?;

        assert_eq!(catalog.sheet_index().count()?, 2);
        let second_id = catalog
            .sheet_index()
            .id_by_url(&format!("{}/anime/2/Two.html", ROOT))?;
        assert_eq!(first_id, second_id);
        let row = catalog
            .sheet_index()
            .single_by_url(&format!("{}/anime/2/Two.html", ROOT))?
            .expect("row");
        assert_eq!(row.page, Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_harvest_sheet_stores_links() -> anyhow::Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let url = format!("{}/anime/8910/Dr-STONE.html", ROOT);
        let fetcher = MemoryFetcher::new().with_page(url.clone(), sheet_page("Dr.STONE", &["Action", "Science"]));
        let harvester = SheetHarvester::new(fetcher, &site());
        let cancel = CancellationToken::new();

        let sheet = harvester.harvest_sheet(&catalog, &url, false, &cancel).await?;
        let sheet_id = sheet.id.expect("stored");
        assert_eq!(sheet.section, Section::Anime);
        assert_eq!(sheet.site_id, Some(8910));
        assert_eq!(sheet.diffusion_state, DiffusionState::Ongoing);
        assert_eq!(sheet.description, None);

        let categories = catalog.links().categories(sheet_id)?;
        assert_eq!(categories.len(), 2);
        assert!(categories.iter().all(|c| c.category_type == CategoryType::Genre));
        let contacts = catalog.links().contacts(sheet_id)?;
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].0, ContactRole::Studio);

        // Harvesting again updates in place
        let again = harvester.harvest_sheet(&catalog, &url, false, &cancel).await?;
        assert_eq!(again.id, Some(sheet_id));
        assert_eq!(catalog.sheets().count()?, 1);
        assert_eq!(catalog.categories().count()?, 2);
        assert_eq!(catalog.contacts().count()?, 1);
        assert_eq!(harvester.fetcher().requests().len(), 2);

        // Reload returns the stored row without a request
        let stored = harvester.harvest_sheet(&catalog, &url, true, &cancel).await?;
        assert_eq!(stored.id, Some(sheet_id));
        assert_eq!(harvester.fetcher().requests().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_harvest_sheet_without_title_writes_nothing() -> anyhow::Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let url = format!("{}/anime/1/Broken.html", ROOT);
        let fetcher = MemoryFetcher::new().with_page(url.clone(), "<p>Maintenance</p>");
        let harvester = SheetHarvester::new(fetcher, &site());

        let result = harvester
            .harvest_sheet(&catalog, &url, false, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(HarvestError::MissingField { field: "name", .. })));
        assert_eq!(catalog.sheets().count()?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_harvest_categories_and_contact() -> anyhow::Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let contact_url = format!("{}/studio/3/TMS.html", ROOT);
        let fetcher = MemoryFetcher::new()
            .with_page(
                format!("{}/genres.html", ROOT),
                r#"<div class="liste_categories" data-type="genre"><ul>
                     <li><a href="/genre/1/Action.html">Action</a></li>
                     <li><a href="/genre/2/Drame.html">Drame</a></li></ul></div>"#,
            )
            .with_page(
                contact_url.clone(),
                r#"<div id="contact_entete"><h1>TMS Entertainment</h1></div>
                   <span class="type_contact">Studio</span>"#,
            );
        let harvester = SheetHarvester::new(fetcher, &site());
        let cancel = CancellationToken::new();

        let report = harvester.harvest_categories(&catalog, Section::Anime, &cancel).await?;
        assert!(report.is_success());
        assert_eq!(catalog.categories().count_by_section(Section::Anime)?, 2);

        let contact = harvester.harvest_contact(&catalog, &contact_url, &cancel).await?;
        assert!(contact.id.is_some());
        assert_eq!(catalog.contacts().count()?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_most_awaited_in_page_order() -> anyhow::Result<()> {
        let fetcher = MemoryFetcher::new()
            .with_page(
                format!("{}/plus-attendus/page-1.html", ROOT),
                listing(&[(1, "One"), (2, "Two")], Some(3), "plus-attendus"),
            )
            .with_page(
                format!("{}/plus-attendus/page-2.html", ROOT),
                listing(&[(3, "Three")], Some(3), "plus-attendus"),
            )
            .with_page(
                format!("{}/plus-attendus/page-3.html", ROOT),
                listing(&[(4, "Four")], Some(3), "plus-attendus"),
            );
        let harvester = SheetHarvester::new(fetcher, &site());

        let rows = harvester
            .harvest_most_awaited(Section::Anime, &CancellationToken::new())
            .await?;
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["One", "Two", "Three", "Four"]);
        assert_eq!(rows[3].page, Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn test_crawl_counts_failures() -> anyhow::Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let fetcher = MemoryFetcher::new()
            .with_page(
                format!("{}/liste/page-1.html", ROOT),
                listing(&[(1, "One"), (2, "Missing"), (3, "Three")], None, "liste"),
            )
            .with_page(format!("{}/anime/1/One.html", ROOT), sheet_page("One", &[]))
            .with_page(format!("{}/anime/3/Three.html", ROOT), sheet_page("Three", &["Action"]));
        let harvester = SheetHarvester::new(fetcher, &site());
        let cancel = CancellationToken::new();

        harvester.harvest_index(&catalog, Section::Anime, &cancel).await?;
        let stats = harvester
            .harvest_indexed_sheets(&catalog, Section::Anime, None, &cancel)
            .await?;
        assert_eq!(stats.candidates, 3);
        assert_eq!(stats.harvested, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(catalog.sheets().count()?, 2);

        // Only the failed sheet is still pending
        let stats = harvester
            .harvest_indexed_sheets(&catalog, Section::Anime, Some(10), &cancel)
            .await?;
        assert_eq!(stats.candidates, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_crawl() -> anyhow::Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let harvester = SheetHarvester::new(MemoryFetcher::new(), &site());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = harvester.harvest_index(&catalog, Section::Anime, &cancel).await;
        assert!(matches!(result, Err(HarvestError::Cancelled)));
        let result = harvester
            .harvest_sheet(&catalog, &format!("{}/anime/1/One.html", ROOT), false, &cancel)
            .await;
        assert!(matches!(result, Err(HarvestError::Cancelled)));
        assert!(harvester.fetcher().requests().is_empty());
        Ok(())
    }
}
