//! Sheet detail pages.
//!
//! Only the title is required. Every other field is optional on the site
//! and comes back as `None`, an empty list or the enum fallback.

use crate::extract::{
    absolute_url, all_texts, decode_label, first, first_attr, first_text, has_match, parse_count,
    parse_date, parse_decimal, selector, site_id_from_url, text_of, SITE_DATE_FORMAT,
};
use catalog::{
    CatalogEnum, Category, CategoryType, Contact, ContactRole, ContactType, DiffusionState, Section,
    Sheet,
};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

static NAME: Lazy<Selector> = Lazy::new(|| selector("#fiche_entete h1"));
static ORIGINAL_NAME: Lazy<Selector> = Lazy::new(|| selector(".nom_original"));
static ALTERNATIVE_NAMES: Lazy<Selector> = Lazy::new(|| selector(".titres_alternatifs li"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector("#fiche_description"));
static IMAGE: Lazy<Selector> = Lazy::new(|| selector("#fiche_image img"));
static RELEASE_DATE: Lazy<Selector> = Lazy::new(|| selector(".date_debut"));
static END_DATE: Lazy<Selector> = Lazy::new(|| selector(".date_fin"));
static EPISODE_COUNT: Lazy<Selector> = Lazy::new(|| selector(".nb_episodes"));
static EPISODE_DURATION: Lazy<Selector> = Lazy::new(|| selector(".duree_episode"));
static STATE: Lazy<Selector> = Lazy::new(|| selector(".etat"));
static SCORE: Lazy<Selector> = Lazy::new(|| selector(".note_moyenne"));
static ADULT: Lazy<Selector> = Lazy::new(|| selector(".avertissement_adulte"));
static EXPLICIT: Lazy<Selector> = Lazy::new(|| selector(".avertissement_explicite"));
static CATEGORY_LINKS: Lazy<Selector> = Lazy::new(|| selector(".categories a"));
static CONTACT_ITEMS: Lazy<Selector> = Lazy::new(|| selector(".contacts li"));
static CONTACT_ROLE: Lazy<Selector> = Lazy::new(|| selector(".role"));
static CONTACT_LINK: Lazy<Selector> = Lazy::new(|| selector("a"));

/// Contact credited on a sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedContact {
    pub role: ContactRole,
    pub contact: Contact,
}

/// Everything read from one sheet page
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedSheet {
    pub sheet: Sheet,
    pub categories: Vec<Category>,
    pub contacts: Vec<ScrapedContact>,
}

/// Parse a sheet page; `None` when the title is missing
pub fn parse_sheet(document: &Html, url: &Url, section: Section) -> Option<ScrapedSheet> {
    let root = document.root_element();
    let name = first_text(root, &NAME)?;

    let mut sheet = Sheet::new(section, url.to_string(), name);
    sheet.site_id = site_id_from_url(url.as_str());
    sheet.original_name = first_text(root, &ORIGINAL_NAME);
    sheet.alternative_names = all_texts(root, &ALTERNATIVE_NAMES);
    sheet.description = first_text(root, &DESCRIPTION);
    sheet.thumbnail_url = first_attr(root, &IMAGE, "src").and_then(|src| absolute_url(url, &src));
    sheet.release_date = first_text(root, &RELEASE_DATE).and_then(|t| parse_date(&t, SITE_DATE_FORMAT));
    sheet.end_date = first_text(root, &END_DATE).and_then(|t| parse_date(&t, SITE_DATE_FORMAT));
    sheet.episode_count = first_text(root, &EPISODE_COUNT).and_then(|t| parse_count(&t));
    sheet.episode_duration = first_text(root, &EPISODE_DURATION).and_then(|t| parse_count(&t));
    sheet.diffusion_state = decode_label::<DiffusionState>(first_text(root, &STATE).as_deref());
    sheet.score = first_text(root, &SCORE)
        .and_then(|t| parse_decimal(&t))
        .filter(|score| (0.0..=10.0).contains(score));
    sheet.is_adult_content = has_match(root, &ADULT);
    sheet.is_explicit_content = has_match(root, &EXPLICIT);

    // An end date before the start is a site typo; keep the start only
    if let (Some(start), Some(end)) = (sheet.release_date, sheet.end_date) {
        if end < start {
            debug!(url = %url, %start, %end, "Dropping inconsistent end date");
            sheet.end_date = None;
        }
    }

    let categories = parse_category_links(document, url, section);
    let contacts = parse_contact_items(document, url);

    Some(ScrapedSheet {
        sheet,
        categories,
        contacts,
    })
}

/// Category type from the first path segment of its link (`/genre/..`, `/theme/..`)
fn category_type_of(url: &str) -> CategoryType {
    Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments().and_then(|mut s| s.next().map(str::to_string)))
        .map(|segment| CategoryType::from_label(&segment))
        .unwrap_or(CategoryType::FALLBACK)
}

fn parse_category_links(document: &Html, base: &Url, section: Section) -> Vec<Category> {
    document
        .select(&CATEGORY_LINKS)
        .filter_map(|link| {
            let name = text_of(link)?;
            let url = link.value().attr("href").and_then(|href| absolute_url(base, href));
            let category_type = url.as_deref().map(category_type_of).unwrap_or(CategoryType::FALLBACK);
            let mut category = Category::new(section, category_type, name);
            category.url = url;
            Some(category)
        })
        .collect()
}

/// Contact type implied by the credited role
fn contact_type_for(role: ContactRole) -> ContactType {
    match role {
        ContactRole::Studio => ContactType::Studio,
        ContactRole::Distributor => ContactType::Distributor,
        ContactRole::Author | ContactRole::Director | ContactRole::Composer => ContactType::Person,
        ContactRole::Unknown => ContactType::Unknown,
    }
}

fn parse_contact_items(document: &Html, base: &Url) -> Vec<ScrapedContact> {
    let mut contacts = Vec::new();

    for item in document.select(&CONTACT_ITEMS) {
        let Some(link) = first(item, &CONTACT_LINK) else {
            continue;
        };
        let (Some(name), Some(url)) = (
            text_of(link),
            link.value().attr("href").and_then(|href| absolute_url(base, href)),
        ) else {
            continue;
        };

        let role = decode_label::<ContactRole>(first_text(item, &CONTACT_ROLE).as_deref());
        let mut contact = Contact::new(url, name);
        contact.site_id = site_id_from_url(&contact.url);
        contact.contact_type = contact_type_for(role);
        contacts.push(ScrapedContact { role, contact });
    }

    contacts
}
