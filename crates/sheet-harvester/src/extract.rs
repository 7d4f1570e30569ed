//! Field extraction helpers shared by the page parsers.
//!
//! Every helper is total: a missing node or unparseable text yields `None`
//! (or the enum fallback), never an error.

use catalog::CatalogEnum;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

/// Date format used on sheet pages
pub const SITE_DATE_FORMAT: &str = "%d/%m/%Y";

static INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,3}(?:[ \u{a0}.]\d{3})+|\d+").expect("static pattern"));
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("static pattern"));
static SITE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d+)(?:/|\.html|$)").expect("static pattern"));

/// Parse a selector known at compile time
pub fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector {:?}: {}", css, e))
}

/// Collapse whitespace runs and trim; empty text is absent
pub fn clean_text(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn text_of(element: ElementRef<'_>) -> Option<String> {
    clean_text(&element.text().collect::<String>())
}

pub fn first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

/// Text of the first match of `selector`
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    first(scope, selector).and_then(text_of)
}

/// Attribute of the first match of `selector`
pub fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    first(scope, selector)
        .and_then(|element| element.value().attr(attr))
        .and_then(clean_text)
}

/// Texts of every match, empty ones dropped
pub fn all_texts(scope: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    scope.select(selector).filter_map(text_of).collect()
}

pub fn has_match(scope: ElementRef<'_>, selector: &Selector) -> bool {
    first(scope, selector).is_some()
}

/// Resolve a possibly relative link into an absolute http(s) URL
pub fn absolute_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let joined = base.join(href).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

/// First integer in the text; thousands separators are accepted
pub fn parse_int(text: &str) -> Option<i64> {
    let found = INTEGER.find(text)?;
    let digits: String = found.as_str().chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

pub fn parse_count(text: &str) -> Option<u32> {
    parse_int(text).and_then(|n| u32::try_from(n).ok())
}

/// First decimal number in the text; a comma is the decimal mark
pub fn parse_decimal(text: &str) -> Option<f64> {
    let found = DECIMAL.find(text)?;
    found.as_str().replace(',', ".").parse().ok()
}

/// Parse the date in `format`; unknown parts (`??/??/2019`) give `None`
pub fn parse_date(text: &str, format: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, format).ok().or_else(|| {
        // Labelled values such as "Début : 05/07/2019"
        text.split_whitespace()
            .find_map(|token| NaiveDate::parse_from_str(token, format).ok())
    })
}

/// Decode a display label, falling back when absent or unknown
pub fn decode_label<E: CatalogEnum>(text: Option<&str>) -> E {
    text.map(E::from_label).unwrap_or(E::FALLBACK)
}

/// Numeric site id embedded in a sheet or contact URL
pub fn site_id_from_url(url: &str) -> Option<i64> {
    let path = Url::parse(url).ok().map(|u| u.path().to_string())?;
    SITE_ID
        .captures(&path)
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse().ok())
        .filter(|&id: &i64| id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{DiffusionState, Section};
    use scraper::Html;

    #[test]
    fn test_text_helpers() {
        let document = Html::parse_fragment(
            r#"<div><h1>  Dr.
                STONE </h1><p class="empty">   </p><a href="/x.html"> x </a></div>"#,
        );
        let root = document.root_element();

        assert_eq!(first_text(root, &selector("h1")).as_deref(), Some("Dr. STONE"));
        assert_eq!(first_text(root, &selector(".empty")), None);
        assert_eq!(first_text(root, &selector(".missing")), None);
        assert_eq!(first_attr(root, &selector("a"), "href").as_deref(), Some("/x.html"));
        assert_eq!(first_attr(root, &selector("a"), "title"), None);
        assert!(has_match(root, &selector("h1")));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_int("24 épisodes"), Some(24));
        assert_eq!(parse_int("1 200 membres"), Some(1200));
        assert_eq!(parse_int("aucun"), None);
        assert_eq!(parse_count("-"), None);
        assert_eq!(parse_decimal("8,4 / 10"), Some(8.4));
        assert_eq!(parse_decimal("7.25"), Some(7.25));
        assert_eq!(parse_decimal("n/a"), None);
    }

    #[test]
    fn test_dates() {
        assert_eq!(
            parse_date("05/07/2019", SITE_DATE_FORMAT),
            NaiveDate::from_ymd_opt(2019, 7, 5)
        );
        assert_eq!(
            parse_date("Début : 05/07/2019", SITE_DATE_FORMAT),
            NaiveDate::from_ymd_opt(2019, 7, 5)
        );
        assert_eq!(parse_date("??/??/2019", SITE_DATE_FORMAT), None);
        assert_eq!(parse_date("31/02/2019", SITE_DATE_FORMAT), None);
    }

    #[test]
    fn test_labels_use_fallback() {
        assert_eq!(decode_label::<DiffusionState>(Some("Terminé")), DiffusionState::Completed);
        assert_eq!(decode_label::<DiffusionState>(Some("???")), DiffusionState::Unknown);
        assert_eq!(decode_label::<Section>(None), Section::Unknown);
    }

    #[test]
    fn test_urls() -> anyhow::Result<()> {
        let base = Url::parse("https://anime.example.org/liste/page-1.html")?;
        assert_eq!(
            absolute_url(&base, "/anime/8910/Dr-STONE.html").as_deref(),
            Some("https://anime.example.org/anime/8910/Dr-STONE.html")
        );
        assert_eq!(absolute_url(&base, "#top"), None);
        assert_eq!(absolute_url(&base, "mailto:someone@example.org"), None);

        assert_eq!(site_id_from_url("https://anime.example.org/anime/8910/Dr-STONE.html"), Some(8910));
        assert_eq!(site_id_from_url("https://anime.example.org/studio/12.html"), Some(12));
        assert_eq!(site_id_from_url("https://anime.example.org/genres.html"), None);
        Ok(())
    }
}
