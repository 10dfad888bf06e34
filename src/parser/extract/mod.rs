pub mod denylist;

use std::sync::LazyLock;

use regex::Regex;

use super::Document;
use crate::record::clean_field;
use denylist::Denylist;

static MODEL_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2}[- ][A-Za-z][\w-]*[- ][\w-]+)").unwrap());

/// One way of reading a field out of a page.
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// First non-empty `h1`-`h3`.
    FirstHeading,
    /// First paragraph containing any keyword (case-insensitive).
    ParagraphWith(&'static [&'static str]),
    FirstParagraph,
    /// Text next to a bold label, e.g. `<b>Product:</b> ...`.
    LabelAdjacent(&'static str),
    /// `label: value` anywhere in the visible body text.
    LabelPattern(&'static str),
    /// `YYYY Make Model` in the body text.
    ModelYear,
    Fixed(&'static str),
}

impl Strategy {
    fn apply(&self, doc: &Document, page: &PageText) -> Option<String> {
        match *self {
            Strategy::FirstHeading => doc.headings().into_iter().next(),
            Strategy::ParagraphWith(words) => page
                .paragraphs
                .iter()
                .find(|p| {
                    let lower = p.to_lowercase();
                    words.iter().any(|w| lower.contains(w))
                })
                .cloned(),
            Strategy::FirstParagraph => page.paragraphs.first().cloned(),
            Strategy::LabelAdjacent(label) => doc.labelled_value(label),
            Strategy::LabelPattern(label) => {
                let re = Regex::new(&format!(r"(?i)\b{}\s*:\s*([^.\n]+)", regex::escape(label)))
                    .ok()?;
                re.captures(&page.body)
                    .and_then(|caps| clean_field(&caps[1]))
            }
            Strategy::ModelYear => MODEL_YEAR_RE
                .captures(&page.body)
                .and_then(|caps| clean_field(&caps[1])),
            Strategy::Fixed(value) => clean_field(value),
        }
    }
}

/// Ordered strategies for one field: first hit wins, then the fallback.
#[derive(Debug, Clone)]
pub struct FieldRule {
    strategies: Vec<Strategy>,
    fallback: Option<&'static str>,
    filtered: bool,
    rejected: &'static [&'static str],
}

impl FieldRule {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        FieldRule {
            strategies,
            fallback: None,
            filtered: false,
            rejected: &[],
        }
    }

    pub fn or_else(mut self, fallback: &'static str) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Run hits through the denylist; a rejected hit ends the chain empty.
    pub fn filtered(mut self) -> Self {
        self.filtered = true;
        self
    }

    /// Filtered, plus fragments that are only wrong for this field.
    pub fn rejecting(mut self, fragments: &'static [&'static str]) -> Self {
        self.filtered = true;
        self.rejected = fragments;
        self
    }

    fn rejects(&self, value: &str, deny: &Denylist) -> bool {
        if !self.filtered {
            return false;
        }
        let lower = value.to_lowercase();
        deny.rejects(value) || self.rejected.iter().any(|f| lower.contains(f))
    }

    fn resolve(&self, doc: &Document, page: &PageText, deny: &Denylist) -> Option<String> {
        let hit = self.strategies.iter().find_map(|s| s.apply(doc, page));
        match hit {
            Some(value) if self.rejects(&value, deny) => None,
            Some(value) => Some(value),
            None => self.fallback.and_then(clean_field),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub title: FieldRule,
    pub description: FieldRule,
    pub product_name: FieldRule,
    pub manufacturer: FieldRule,
    pub recall_reason: FieldRule,
}

/// Best-effort fields from one detail page. Never fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub product_name: Option<String>,
    pub manufacturer: Option<String>,
    pub recall_reason: Option<String>,
}

struct PageText {
    paragraphs: Vec<String>,
    body: String,
}

pub fn extract(doc: &Document, rules: &ExtractionRules, deny: &Denylist) -> ExtractedFields {
    let page = PageText {
        paragraphs: doc.paragraphs(),
        body: doc.body_text(),
    };
    ExtractedFields {
        title: rules.title.resolve(doc, &page, deny),
        description: rules.description.resolve(doc, &page, deny),
        product_name: rules.product_name.resolve(doc, &page, deny),
        manufacturer: rules.manufacturer.resolve(doc, &page, deny),
        recall_reason: rules.recall_reason.resolve(doc, &page, deny),
    }
}

// ── Tests ──
