//! URL layout of the source site.
//!
//! Each section lives on its own host, built from `SiteConfig::base_url` by
//! substituting `{section}`; paths with a `{page}` placeholder are paginated.

use crate::error::FetchError;
use catalog::config::SiteConfig;
use catalog::{CatalogEnum, Section};
use url::Url;

/// URL pattern with a `{page}` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    pattern: String,
}

impl PageTemplate {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn url_for(&self, page: u32) -> Result<Url, FetchError> {
        let raw = self.pattern.replace("{page}", &page.to_string());
        Url::parse(&raw).map_err(|e| FetchError::invalid_url(raw, e))
    }
}

#[derive(Debug, Clone)]
pub struct SiteLayout {
    base_url: String,
    listing_path: String,
    most_awaited_path: String,
    categories_path: String,
}

impl SiteLayout {
    pub fn from_config(site: &SiteConfig) -> Self {
        Self {
            base_url: site.base_url.trim_end_matches('/').to_string(),
            listing_path: site.listing_path.clone(),
            most_awaited_path: site.most_awaited_path.clone(),
            categories_path: site.categories_path.clone(),
        }
    }

    /// Root URL of a section
    pub fn section_root(&self, section: Section) -> Result<Url, FetchError> {
        let raw = format!("{}/", self.base_url.replace("{section}", section.slug()));
        Url::parse(&raw).map_err(|e| FetchError::invalid_url(raw, e))
    }

    pub fn listing(&self, section: Section) -> PageTemplate {
        self.template(section, &self.listing_path)
    }

    pub fn most_awaited(&self, section: Section) -> PageTemplate {
        self.template(section, &self.most_awaited_path)
    }

    pub fn categories_url(&self, section: Section) -> Result<Url, FetchError> {
        let raw = self.join(section, &self.categories_path);
        Url::parse(&raw).map_err(|e| FetchError::invalid_url(raw, e))
    }

    /// Section whose host serves `url`; `Unknown` for foreign hosts
    pub fn section_of(&self, url: &Url) -> Section {
        Section::ALL
            .iter()
            .copied()
            .filter(|&section| section != Section::Unknown)
            .find(|&section| {
                self.section_root(section)
                    .ok()
                    .is_some_and(|root| root.host_str() == url.host_str())
            })
            .unwrap_or(Section::Unknown)
    }

    fn template(&self, section: Section, path: &str) -> PageTemplate {
        PageTemplate::new(self.join(section, path))
    }

    fn join(&self, section: Section, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.replace("{section}", section.slug()),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> SiteLayout {
        SiteLayout::from_config(&SiteConfig {
            base_url: "https://{section}.example.org/".to_string(),
            ..SiteConfig::default()
        })
    }

    #[test]
    fn test_section_urls() -> anyhow::Result<()> {
        let layout = layout();
        assert_eq!(
            layout.listing(Section::Anime).url_for(3)?.as_str(),
            "https://anime.example.org/liste/page-3.html"
        );
        assert_eq!(
            layout.most_awaited(Section::Manga).url_for(1)?.as_str(),
            "https://manga.example.org/plus-attendus/page-1.html"
        );
        assert_eq!(
            layout.categories_url(Section::LightNovel)?.as_str(),
            "https://novel.example.org/genres.html"
        );
        Ok(())
    }

    #[test]
    fn test_section_of() -> anyhow::Result<()> {
        let layout = layout();
        let url = Url::parse("https://drama.example.org/drama/4/x.html")?;
        assert_eq!(layout.section_of(&url), Section::Drama);
        let foreign = Url::parse("https://elsewhere.org/anime/4/x.html")?;
        assert_eq!(layout.section_of(&foreign), Section::Unknown);
        Ok(())
    }

    #[test]
    fn test_malformed_template() {
        let template = PageTemplate::new("not a url {page}");
        assert!(matches!(template.url_for(1), Err(FetchError::InvalidUrl { .. })));
    }
}
