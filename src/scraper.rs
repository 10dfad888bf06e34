use std::time::Duration;

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::parser::extract::denylist::Denylist;
use crate::parser::extract::ExtractedFields;
use crate::parser::Document;
use crate::record::{sort_newest_first, IdKind, RecallRecord, RunStamp};
use crate::registry::{Access, AccessMode, Registry, ScrapeRules, SourceDescriptor};
use crate::render::{render_within, RenderSession, Renderer};

const MIN_TITLE_CHARS: usize = 5;
const MIN_DESCRIPTION_CHARS: usize = 20;

/// Titles of bot challenges and error pages rather than recalls.
const REJECTED_TITLES: &[&str] = &[
    "robot or human",
    "javascript:void",
    "page not found",
    "access denied",
    "just a moment",
    "attention required",
];

/// Per-navigation deadlines and settle delays.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub index_timeout: Duration,
    pub detail_timeout: Duration,
    pub index_settle: Duration,
    pub detail_settle: Duration,
    pub max_candidates: usize,
}

/// Is this page worth emitting? Short or bot-challenge titles and thin
/// descriptions are dropped.
pub fn accepts(fields: &ExtractedFields) -> bool {
    let Some(title) = fields.title.as_deref() else {
        return false;
    };
    if title.chars().count() <= MIN_TITLE_CHARS {
        return false;
    }
    let lower = title.to_lowercase();
    if REJECTED_TITLES.iter().any(|p| lower.contains(p)) {
        return false;
    }
    fields
        .description
        .as_deref()
        .is_some_and(|d| d.chars().count() > MIN_DESCRIPTION_CHARS)
}

fn discover(rules: &ScrapeRules, markup: &str, base: &Url) -> Vec<String> {
    rules.discover_links(&Document::parse(markup), base)
}

/// Parse and extract in one synchronous step; the parsed document never lives
/// across an await.
fn extract_page(
    descriptor: &SourceDescriptor,
    rules: &ScrapeRules,
    markup: &str,
    denylist: &Denylist,
) -> (ExtractedFields, Option<chrono::NaiveDate>) {
    let doc = Document::parse(markup);
    let fields = rules.extract_fields(descriptor.name, &doc, denylist);
    (fields, doc.published_date())
}

/// Scrape one source; errors before any candidate is visited are returned.
pub async fn try_scrape_source<R: Renderer>(
    renderer: &R,
    descriptor: &SourceDescriptor,
    denylist: &Denylist,
    timing: &Timing,
    stamp: &RunStamp,
) -> Result<Vec<RecallRecord>, FetchError> {
    let Access::Scrape(rules) = &descriptor.access else {
        return Ok(Vec::new());
    };
    let base = Url::parse(rules.index_url).map_err(|e| FetchError::Render {
        url: rules.index_url.to_string(),
        message: e.to_string(),
    })?;

    info!(source = descriptor.name, url = rules.index_url, "Scraping source");
    let mut session = renderer.open().await?;

    let index = render_within(&mut session, rules.index_url, timing.index_timeout).await?;
    tokio::time::sleep(timing.index_settle).await;

    let candidates = discover(rules, &index, &base);
    debug!(source = descriptor.name, found = candidates.len(), "Candidate links");

    let mut records = Vec::new();
    for (n, url) in candidates.iter().take(timing.max_candidates).enumerate() {
        let markup = match render_within(&mut session, url, timing.detail_timeout).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(source = descriptor.name, url = %url, error = %e, "Skipping candidate");
                continue;
            }
        };
        tokio::time::sleep(timing.detail_settle).await;

        let (fields, published) = extract_page(descriptor, rules, &markup, denylist);
        if !accepts(&fields) {
            debug!(source = descriptor.name, url = %url, title = ?fields.title, "Rejected candidate");
            continue;
        }

        let ExtractedFields {
            title,
            description,
            product_name,
            manufacturer,
            recall_reason,
        } = fields;
        records.push(RecallRecord {
            id: stamp.id(descriptor.name, IdKind::Specific, n),
            title: title.unwrap_or_default(),
            link: url.clone(),
            date: published.unwrap_or(stamp.today),
            source: descriptor.name.to_string(),
            category: descriptor.category.to_string(),
            description,
            product_name,
            manufacturer,
            recall_reason,
        });
    }

    info!(source = descriptor.name, accepted = records.len(), "Scraped source");
    Ok(records)
}

/// Like [`try_scrape_source`], but a failed source contributes nothing.
pub async fn scrape_source<R: Renderer>(
    renderer: &R,
    descriptor: &SourceDescriptor,
    denylist: &Denylist,
    timing: &Timing,
    stamp: &RunStamp,
) -> Vec<RecallRecord> {
    match try_scrape_source(renderer, descriptor, denylist, timing, stamp).await {
        Ok(records) => records,
        Err(e) => {
            warn!(source = descriptor.name, error = %e, "Error scraping source");
            Vec::new()
        }
    }
}

/// Every scrape-mode source in registry order, newest first.
pub async fn scrape_all_sources<R: Renderer>(
    renderer: &R,
    registry: &Registry,
    denylist: &Denylist,
    timing: &Timing,
    stamp: &RunStamp,
) -> Vec<RecallRecord> {
    let mut all = Vec::new();
    for descriptor in registry.by_mode(AccessMode::Scrape) {
        all.extend(scrape_source(renderer, descriptor, denylist, timing, stamp).await);
    }
    sort_newest_first(&mut all);
    all
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::registry::Profile;

    /// Pages keyed by URL. Unknown URLs fail like a dead navigation.
    #[derive(Default, Clone)]
    pub(crate) struct MapRenderer {
        pub pages: Arc<HashMap<String, String>>,
    }

    impl MapRenderer {
        pub(crate) fn new(pages: &[(&str, &str)]) -> Self {
            MapRenderer {
                pages: Arc::new(
                    pages
                        .iter()
                        .map(|(url, body)| (url.to_string(), body.to_string()))
                        .collect(),
                ),
            }
        }
    }

    impl Renderer for MapRenderer {
        type Session = MapRenderer;

        async fn open(&self) -> Result<MapRenderer, FetchError> {
            Ok(self.clone())
        }
    }

    impl RenderSession for MapRenderer {
        async fn render(&mut self, url: &str) -> Result<String, FetchError> {
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Render {
                url: url.to_string(),
                message: "navigation failed".to_string(),
            })
        }
    }

    pub(crate) fn quick_timing() -> Timing {
        Timing {
            index_timeout: Duration::from_secs(5),
            detail_timeout: Duration::from_secs(5),
            index_settle: Duration::ZERO,
            detail_settle: Duration::ZERO,
            max_candidates: 3,
        }
    }

    pub(crate) fn stamp() -> RunStamp {
        RunStamp {
            millis: 1_700_000_000_000,
            today: "2024-06-15".parse().unwrap(),
        }
    }

    pub(crate) const INDEX: &str = "https://recalls.example/recalls";

    pub(crate) fn example_source() -> SourceDescriptor {
        SourceDescriptor {
            name: "Example Agency",
            category: "General",
            access: Access::Scrape(ScrapeRules {
                index_url: INDEX,
                link_paths: &["/recalls/"],
                link_words: &["recall"],
                link_cap: 5,
                topic_words: &["recall"],
                placeholder_title: "Example Recall Notice",
                profile: Profile::Agency,
            }),
        }
    }

    pub(crate) fn index_page(hrefs: &[&str]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|h| format!(r#"<a href="{}">Recall notice</a>"#, h))
            .collect();
        format!("<html><body>{}</body></html>", anchors)
    }

    fn detail(title: &str, description: &str) -> String {
        format!("<html><body><h1>{}</h1><p>{}</p></body></html>", title, description)
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }

    #[test]
    fn gate_rejects_thin_pages() {
        let ok = ExtractedFields {
            title: Some("Acme Recalls Chips".into()),
            description: Some("Acme Foods is recalling chips nationwide.".into()),
            ..Default::default()
        };
        assert!(accepts(&ok));

        let short = ExtractedFields { title: Some("Alert".into()), ..ok.clone() };
        assert!(!accepts(&short));

        let bot = ExtractedFields { title: Some("Robot or Human?".into()), ..ok.clone() };
        assert!(!accepts(&bot));

        let thin = ExtractedFields { description: Some("Too short.".into()), ..ok.clone() };
        assert!(!accepts(&thin));

        let missing = ExtractedFields { description: None, ..ok };
        assert!(!accepts(&missing));
    }

    #[tokio::test]
    async fn scrapes_accepted_candidates_only() {
        let index = index_page(&[
            "/recalls/chips",
            "/recalls/challenge",
            "/recalls/gone",
            "/recalls/fourth",
        ]);
        let renderer = MapRenderer::new(&[
            (INDEX, index.as_str()),
            ("https://recalls.example/recalls/chips", fixture("fda_detail.html").as_str()),
            (
                "https://recalls.example/recalls/challenge",
                detail("Robot or human?", "Please verify you are a human being to continue.").as_str(),
            ),
            (
                "https://recalls.example/recalls/fourth",
                detail("Never Visited Recall", "Beyond the candidate cap for this run.").as_str(),
            ),
        ]);

        let records = try_scrape_source(
            &renderer,
            &example_source(),
            &Denylist::default(),
            &quick_timing(),
            &stamp(),
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.link, "https://recalls.example/recalls/chips");
        assert_eq!(r.id, "example-agency-specific-1700000000000-0");
        assert_eq!(r.date.to_string(), "2024-03-05");
        assert_eq!(r.category, "General");
        assert_eq!(r.manufacturer.as_deref(), Some("Acme Foods LLC"));
    }

    #[tokio::test]
    async fn undated_page_gets_run_date() {
        let index = index_page(&["/recalls/heater"]);
        let renderer = MapRenderer::new(&[
            (INDEX, index.as_str()),
            ("https://recalls.example/recalls/heater", fixture("cpsc_boilerplate.html").as_str()),
        ]);
        let records = scrape_source(
            &renderer,
            &example_source(),
            &Denylist::default(),
            &quick_timing(),
            &stamp(),
        )
        .await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, stamp().today);
        assert_eq!(records[0].manufacturer, None);
    }

    #[tokio::test]
    async fn dead_index_contributes_nothing() {
        let renderer = MapRenderer::default();
        let checked = try_scrape_source(
            &renderer,
            &example_source(),
            &Denylist::default(),
            &quick_timing(),
            &stamp(),
        )
        .await;
        assert!(matches!(checked, Err(FetchError::Render { .. })));

        let absorbed = scrape_source(
            &renderer,
            &example_source(),
            &Denylist::default(),
            &quick_timing(),
            &stamp(),
        )
        .await;
        assert!(absorbed.is_empty());
    }

    /// Never answers, so only the deadline ends the navigation.
    struct StalledRenderer;

    impl Renderer for StalledRenderer {
        type Session = StalledRenderer;

        async fn open(&self) -> Result<StalledRenderer, FetchError> {
            Ok(StalledRenderer)
        }
    }

    impl RenderSession for StalledRenderer {
        async fn render(&mut self, _url: &str) -> Result<String, FetchError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_navigation_times_out() {
        let timing = Timing {
            index_timeout: Duration::from_millis(50),
            ..quick_timing()
        };
        let result =
            try_scrape_source(&StalledRenderer, &example_source(), &Denylist::default(), &timing, &stamp())
                .await;
        assert!(matches!(result, Err(FetchError::Timeout { .. })));
    }
}
