//! Paginated listing traversal.
//!
//! The first listing page tells the page range through its pager links. A
//! page without a pager is a single-page listing.
//!
//! Sequential walks keep a fixed delay between requests and may overlap
//! the download of page N+1 with the extraction of page N. Concurrent walks
//! request every remaining page at once. Both return records in page order
//! and, within a page, in document order.

use crate::error::{HarvestError, HarvestResult};
use crate::extract::{first_attr, selector};
use crate::fetch::{Pacer, PageFetcher};
use crate::site::PageTemplate;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

static PAGER_FIRST: Lazy<Selector> = Lazy::new(|| selector(".pagination a.first"));
static PAGER_LAST: Lazy<Selector> = Lazy::new(|| selector(".pagination a.last"));
static PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"page[-=](\d+)").expect("static pattern"));

/// Inclusive range of listing pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub min: u32,
    pub max: u32,
}

impl PageRange {
    pub const SINGLE: PageRange = PageRange { min: 1, max: 1 };

    pub fn pages(self) -> RangeInclusive<u32> {
        self.min..=self.max
    }

    pub fn page_count(self) -> usize {
        (self.max - self.min) as usize + 1
    }
}

/// Read the page range from the pager
///
/// Both the first and the last link must be present, otherwise the listing
/// is treated as `SINGLE`.
pub fn discover_page_range(document: &Html) -> PageRange {
    let root = document.root_element();
    let first = first_attr(root, &PAGER_FIRST, "href").and_then(|href| page_number(&href));
    let last = first_attr(root, &PAGER_LAST, "href").and_then(|href| page_number(&href));

    match (first, last) {
        (Some(min), Some(max)) if min >= 1 && min <= max => PageRange { min, max },
        _ => PageRange::SINGLE,
    }
}

fn page_number(href: &str) -> Option<u32> {
    PAGE_NUMBER
        .captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|n| n.as_str().parse().ok())
}

/// Parse a body and run the extractor; the document never outlives the call
fn extract_page<T, X>(body: &str, page: u32, extract: &mut X) -> Vec<T>
where
    X: FnMut(&Html, u32) -> Vec<T>,
{
    let document = Html::parse_document(body);
    extract(&document, page)
}

fn range_of(body: &str) -> PageRange {
    discover_page_range(&Html::parse_document(body))
}

pub struct PaginationWalker<'a, F: PageFetcher> {
    fetcher: &'a F,
    pacer: Pacer,
    prefetch: bool,
    cancel: CancellationToken,
}

impl<'a, F: PageFetcher> PaginationWalker<'a, F> {
    pub fn new(fetcher: &'a F, page_delay: Duration, prefetch: bool, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            pacer: Pacer::new(page_delay),
            prefetch,
            cancel,
        }
    }

    fn check_cancelled(&self) -> HarvestResult<()> {
        if self.cancel.is_cancelled() {
            info!("Pagination cancelled");
            return Err(HarvestError::Cancelled);
        }
        Ok(())
    }

    /// Fetch the first page of the range and discover the range from it
    async fn open(&mut self, template: &PageTemplate) -> HarvestResult<(PageRange, String)> {
        self.check_cancelled()?;
        self.pacer.acquire().await;
        let first_body = self.fetcher.fetch(&template.url_for(1)?).await?;
        let range = range_of(&first_body);

        let body = if range.min == 1 {
            first_body
        } else {
            self.check_cancelled()?;
            self.pacer.acquire().await;
            self.fetcher.fetch(&template.url_for(range.min)?).await?
        };

        debug!(min = range.min, max = range.max, "Discovered page range");
        Ok((range, body))
    }

    /// Walk every page one after another
    ///
    /// Any fetch failure aborts the walk; no partial result is returned.
    pub async fn walk<T, X>(&mut self, template: &PageTemplate, mut extract: X) -> HarvestResult<Vec<T>>
    where
        X: FnMut(&Html, u32) -> Vec<T>,
    {
        let (range, mut body) = self.open(template).await?;
        let mut records = Vec::new();

        for page in range.pages() {
            self.check_cancelled()?;
            let next_url = if page < range.max {
                Some(template.url_for(page + 1)?)
            } else {
                None
            };

            let fetcher = self.fetcher;
            let (page_records, next_body) = match next_url {
                Some(url) if self.prefetch => {
                    let pacer = &mut self.pacer;
                    let download = async {
                        pacer.acquire().await;
                        fetcher.fetch(&url).await
                    };
                    let current = async { extract_page(&body, page, &mut extract) };
                    let (next, page_records) = tokio::join!(download, current);
                    (page_records, Some(next?))
                }
                Some(url) => {
                    let page_records = extract_page(&body, page, &mut extract);
                    self.check_cancelled()?;
                    self.pacer.acquire().await;
                    (page_records, Some(fetcher.fetch(&url).await?))
                }
                None => (extract_page(&body, page, &mut extract), None),
            };

            debug!(page, records = page_records.len(), "Extracted listing page");
            records.extend(page_records);
            if let Some(next_body) = next_body {
                body = next_body;
            }
        }

        info!(pages = range.page_count(), records = records.len(), "Listing walk complete");
        Ok(records)
    }

    /// Request every page of the range concurrently
    ///
    /// Responses are extracted in page order once all have arrived; any
    /// failure fails the whole walk.
    pub async fn walk_concurrent<T, X>(
        &mut self,
        template: &PageTemplate,
        mut extract: X,
    ) -> HarvestResult<Vec<T>>
    where
        X: FnMut(&Html, u32) -> Vec<T>,
    {
        let (range, first_body) = self.open(template).await?;
        self.check_cancelled()?;

        let mut urls = Vec::with_capacity(range.page_count().saturating_sub(1));
        for page in range.pages().skip(1) {
            urls.push((page, template.url_for(page)?));
        }

        let fetcher = self.fetcher;
        let responses = join_all(urls.iter().map(|(_, url)| fetcher.fetch(url))).await;
        self.check_cancelled()?;

        let mut records = extract_page(&first_body, range.min, &mut extract);
        for ((page, _), response) in urls.iter().zip(responses) {
            let body = response?;
            records.extend(extract_page(&body, *page, &mut extract));
        }

        info!(pages = range.page_count(), records = records.len(), "Concurrent listing walk complete");
        Ok(records)
    }
}
