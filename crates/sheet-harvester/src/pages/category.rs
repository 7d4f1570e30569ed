//! Category index page of a section.
//!
//! Genres and themes come in separate blocks whose `data-type` attribute
//! names the category type.

use crate::extract::{absolute_url, clean_text, selector, text_of};
use catalog::{CatalogEnum, Category, CategoryType, Section};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

static BLOCKS: Lazy<Selector> = Lazy::new(|| selector(".liste_categories[data-type]"));
static LINKS: Lazy<Selector> = Lazy::new(|| selector("li a"));

pub fn parse_categories(document: &Html, base: &Url, section: Section) -> Vec<Category> {
    let mut categories = Vec::new();

    for block in document.select(&BLOCKS) {
        let category_type = block
            .value()
            .attr("data-type")
            .map(CategoryType::from_label)
            .unwrap_or(CategoryType::FALLBACK);

        for link in block.select(&LINKS) {
            let Some(name) = text_of(link) else {
                continue;
            };
            let mut category = Category::new(section, category_type, name);
            category.url = link.value().attr("href").and_then(|href| absolute_url(base, href));
            category.description = link.value().attr("title").and_then(clean_text);
            categories.push(category);
        }
    }

    debug!(section = %section, categories = categories.len(), "Parsed category page");
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categories() -> anyhow::Result<()> {
        let page = r#"
            <div class="liste_categories" data-type="genre"><ul>
              <li><a href="/genre/1/Action.html" title="Combats et poursuites">Action</a></li>
              <li><a href="/genre/2/Comedie.html">Comédie</a></li>
            </ul></div>
            <div class="liste_categories" data-type="theme"><ul>
              <li><a href="/theme/7/Science.html">Science</a></li>
              <li><a href="/theme/8/Vide.html">  </a></li>
            </ul></div>
            <div class="liste_categories" data-type="demographie"><ul>
              <li><a href="/demo/1/Shonen.html">Shōnen</a></li>
            </ul></div>"#;
        let base = Url::parse("https://anime.example.org/genres.html")?;
        let categories = parse_categories(&Html::parse_document(page), &base, Section::Anime);

        assert_eq!(categories.len(), 4);
        assert_eq!(categories[0].category_type, CategoryType::Genre);
        assert_eq!(categories[0].description.as_deref(), Some("Combats et poursuites"));
        assert_eq!(categories[1].url.as_deref(), Some("https://anime.example.org/genre/2/Comedie.html"));
        assert_eq!(categories[2].category_type, CategoryType::Theme);
        assert_eq!(categories[3].category_type, CategoryType::Unknown);
        assert!(categories.iter().all(|c| c.section == Section::Anime));
        Ok(())
    }
}
