mod catalog;

use reqwest::Url;

use crate::error::RegistryError;
use crate::parser::extract::denylist::Denylist;
use crate::parser::extract::{self, ExtractedFields, ExtractionRules, FieldRule, Strategy};
use crate::parser::{links, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Feed,
    Scrape,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Feed => f.pad("feed"),
            AccessMode::Scrape => f.pad("scrape"),
        }
    }
}

/// How a source is reached.
#[derive(Debug, Clone)]
pub enum Access {
    /// Syndication feed. `home` is the fallback link for items without one.
    Feed { url: &'static str, home: &'static str },
    Scrape(ScrapeRules),
}

/// Static description of one upstream origin. Never mutated after startup.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub name: &'static str,
    pub category: &'static str,
    pub access: Access,
}

impl SourceDescriptor {
    pub fn mode(&self) -> AccessMode {
        match self.access {
            Access::Feed { .. } => AccessMode::Feed,
            Access::Scrape(_) => AccessMode::Scrape,
        }
    }

    pub fn url(&self) -> &'static str {
        match &self.access {
            Access::Feed { url, .. } => url,
            Access::Scrape(rules) => rules.index_url,
        }
    }
}

/// Field extraction variant selected per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Regulators and news outlets: product and company come from the page.
    Agency,
    /// Vehicle recalls: product is a model-year line, no company field.
    Vehicle,
    /// The source is itself the manufacturer or retailer.
    Brand,
}

/// Heuristics for a scrape-mode source.
#[derive(Debug, Clone)]
pub struct ScrapeRules {
    pub index_url: &'static str,
    /// Path fragments marking a probable detail page, e.g. `/recalls/`.
    pub link_paths: &'static [&'static str],
    /// Anchor-text keywords marking a probable detail page.
    pub link_words: &'static [&'static str],
    pub link_cap: usize,
    /// Paragraph keywords preferred for the description.
    pub topic_words: &'static [&'static str],
    pub placeholder_title: &'static str,
    pub profile: Profile,
}

const REASON_WORDS: &[&str] = &["because", "reason", "safety", "risk"];
const VEHICLE_REASON_WORDS: &[&str] = &["because", "reason", "safety", "defect", "risk"];
const VEHICLE_WORDS: &[&str] = &["vehicle", "model"];
/// Manufacturer-only rejections, on top of the shared denylist.
const MANUFACTURER_NOISE: &[&str] = &["company"];

impl ScrapeRules {
    /// Probable detail-page URLs found on a rendered index page, deduplicated
    /// and capped at `link_cap`.
    pub fn discover_links(&self, doc: &Document, base: &Url) -> Vec<String> {
        links::discover(doc, base, self.link_paths, self.link_words, self.link_cap)
    }

    /// Ordered strategies per field for this source.
    pub fn extraction_rules(&self, source: &'static str) -> ExtractionRules {
        let title = FieldRule::new(vec![Strategy::FirstHeading])
            .or_else(self.placeholder_title);
        let description = FieldRule::new(vec![
            Strategy::ParagraphWith(self.topic_words),
            Strategy::FirstParagraph,
        ]);
        let labelled = |label: &'static str| {
            FieldRule::new(vec![Strategy::LabelAdjacent(label), Strategy::LabelPattern(label)])
                .filtered()
        };

        match self.profile {
            Profile::Agency => ExtractionRules {
                title,
                description,
                product_name: labelled("Product"),
                manufacturer: labelled("Company").rejecting(MANUFACTURER_NOISE),
                recall_reason: FieldRule::new(vec![Strategy::ParagraphWith(REASON_WORDS)]),
            },
            Profile::Vehicle => ExtractionRules {
                title,
                description,
                product_name: FieldRule::new(vec![
                    Strategy::ModelYear,
                    Strategy::ParagraphWith(VEHICLE_WORDS),
                ])
                .filtered(),
                manufacturer: FieldRule::new(Vec::new()),
                recall_reason: FieldRule::new(vec![Strategy::ParagraphWith(VEHICLE_REASON_WORDS)]),
            },
            Profile::Brand => ExtractionRules {
                title,
                description,
                product_name: labelled("Product"),
                manufacturer: FieldRule::new(vec![Strategy::Fixed(source)]),
                recall_reason: FieldRule::new(vec![Strategy::ParagraphWith(REASON_WORDS)]),
            },
        }
    }

    pub fn extract_fields(
        &self,
        source: &'static str,
        doc: &Document,
        denylist: &Denylist,
    ) -> ExtractedFields {
        extract::extract(doc, &self.extraction_rules(source), denylist)
    }
}

/// Ordered, read-only catalog of sources.
#[derive(Debug, Clone)]
pub struct Registry {
    sources: Vec<SourceDescriptor>,
}

impl Registry {
    pub fn builtin() -> Self {
        Registry::new(catalog::sources())
    }

    pub fn new(sources: Vec<SourceDescriptor>) -> Self {
        Registry { sources }
    }

    pub fn list_sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn find_source(&self, name: &str) -> Result<&SourceDescriptor, RegistryError> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn by_mode(&self, mode: AccessMode) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter().filter(move |s| s.mode() == mode)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::record::slugify;

    #[test]
    fn builtin_names_and_slugs_are_unique() {
        let registry = Registry::builtin();
        let mut names = HashSet::new();
        let mut slugs = HashSet::new();
        for source in registry.list_sources() {
            assert!(names.insert(source.name), "duplicate name {}", source.name);
            assert!(slugs.insert(slugify(source.name)), "slug clash for {}", source.name);
        }
    }

    #[test]
    fn builtin_urls_are_absolute() {
        for source in Registry::builtin().list_sources() {
            assert!(Url::parse(source.url()).is_ok(), "{} has a bad url", source.name);
            if let Access::Feed { home, .. } = source.access {
                assert!(Url::parse(home).is_ok());
            }
        }
    }

    #[test]
    fn scrape_caps_stay_in_range() {
        for source in Registry::builtin().by_mode(AccessMode::Scrape) {
            if let Access::Scrape(rules) = &source.access {
                assert!((3..=5).contains(&rules.link_cap), "{}", source.name);
                assert!(!rules.placeholder_title.is_empty());
            }
        }
    }

    #[test]
    fn find_source_hits_and_misses() {
        let registry = Registry::builtin();
        assert_eq!(registry.find_source("NHTSA").unwrap().category, "Vehicles");
        assert!(matches!(
            registry.find_source("Nobody"),
            Err(RegistryError::NotFound(name)) if name == "Nobody"
        ));
    }

    #[test]
    fn both_modes_present_in_order() {
        let registry = Registry::builtin();
        assert!(registry.by_mode(AccessMode::Feed).count() >= 1);
        assert!(registry.by_mode(AccessMode::Scrape).count() >= 20);
        assert_eq!(registry.list_sources()[0].mode(), AccessMode::Feed);
    }
}
