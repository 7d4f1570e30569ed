//! Contact detail pages (studios, people, distributors).

use crate::extract::{absolute_url, decode_label, first_attr, first_text, selector, site_id_from_url};
use catalog::{Contact, ContactType};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static NAME: Lazy<Selector> = Lazy::new(|| selector("#contact_entete h1"));
static CONTACT_TYPE: Lazy<Selector> = Lazy::new(|| selector(".type_contact"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector("#contact_description"));
static IMAGE: Lazy<Selector> = Lazy::new(|| selector("#contact_image img"));

/// Parse a contact page; `None` when the name is missing
pub fn parse_contact(document: &Html, url: &Url) -> Option<Contact> {
    let root = document.root_element();
    let name = first_text(root, &NAME)?;

    let mut contact = Contact::new(url.to_string(), name);
    contact.site_id = site_id_from_url(url.as_str());
    contact.contact_type = decode_label::<ContactType>(first_text(root, &CONTACT_TYPE).as_deref());
    contact.description = first_text(root, &DESCRIPTION);
    contact.thumbnail_url = first_attr(root, &IMAGE, "src").and_then(|src| absolute_url(url, &src));
    Some(contact)
}
