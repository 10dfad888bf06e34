use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::error::{FetchError, RegistryError, StoreError};
use crate::feed;
use crate::net::Fetch;
use crate::parser::extract::denylist::Denylist;
use crate::record::{sort_newest_first, RecallRecord, RunStamp};
use crate::registry::{AccessMode, Registry, SourceDescriptor};
use crate::render::Renderer;
use crate::scraper::{self, Timing};
use crate::store::RecordStore;

/// Outcome of one source within a run.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: &'static str,
    pub mode: AccessMode,
    pub count: usize,
    /// The absorbed failure, if the source contributed nothing because of one.
    pub error: Option<String>,
}

/// One full pass over the registry.
#[derive(Debug, Clone)]
pub struct AggregationRun {
    pub records: Vec<RecallRecord>,
    pub reports: Vec<SourceReport>,
    pub finished_at: DateTime<Utc>,
}

impl AggregationRun {
    pub fn failed_sources(&self) -> usize {
        self.reports.iter().filter(|r| r.error.is_some()).count()
    }
}

/// Drives every source through its adapter, one at a time in registry order.
pub struct Aggregator<F, R> {
    registry: Registry,
    fetcher: F,
    renderer: R,
    denylist: Denylist,
    timing: Timing,
    progress: ProgressBar,
}

impl<F: Fetch, R: Renderer> Aggregator<F, R> {
    pub fn new(registry: Registry, fetcher: F, renderer: R, denylist: Denylist, timing: Timing) -> Self {
        Aggregator {
            registry,
            fetcher,
            renderer,
            denylist,
            timing,
            progress: ProgressBar::hidden(),
        }
    }

    /// Show a progress bar over sources (CLI runs).
    pub fn with_progress(mut self) -> Self {
        let pb = ProgressBar::new(self.registry.list_sources().len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        self.progress = pb;
        self
    }

    async fn collect_one(
        &self,
        descriptor: &SourceDescriptor,
        stamp: &RunStamp,
    ) -> Result<Vec<RecallRecord>, FetchError> {
        match descriptor.mode() {
            AccessMode::Feed => feed::try_fetch_feed(&self.fetcher, descriptor, stamp).await,
            AccessMode::Scrape => {
                scraper::try_scrape_source(&self.renderer, descriptor, &self.denylist, &self.timing, stamp)
                    .await
            }
        }
    }

    /// Visit every source; a failing source is reported and contributes nothing.
    pub async fn collect(&self) -> AggregationRun {
        let stamp = RunStamp::now();
        let mut records = Vec::new();
        let mut reports = Vec::new();

        for descriptor in self.registry.list_sources() {
            self.progress.set_message(descriptor.name);
            let outcome = self.collect_one(descriptor, &stamp).await;
            let report = match outcome {
                Ok(found) => {
                    let count = found.len();
                    records.extend(found);
                    SourceReport {
                        source: descriptor.name,
                        mode: descriptor.mode(),
                        count,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(source = descriptor.name, url = descriptor.url(), error = %e, "Source failed");
                    SourceReport {
                        source: descriptor.name,
                        mode: descriptor.mode(),
                        count: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            reports.push(report);
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();

        sort_newest_first(&mut records);
        let run = AggregationRun {
            records,
            reports,
            finished_at: Utc::now(),
        };
        info!(
            records = run.records.len(),
            sources = run.reports.len(),
            failed = run.failed_sources(),
            "Aggregation finished"
        );
        run
    }

    /// One named source, failures absorbed like in a full run.
    pub async fn collect_source(&self, name: &str) -> Result<Vec<RecallRecord>, RegistryError> {
        let descriptor = self.registry.find_source(name)?;
        let stamp = RunStamp::now();
        Ok(match descriptor.mode() {
            AccessMode::Feed => feed::fetch_feed(&self.fetcher, descriptor, &stamp).await,
            AccessMode::Scrape => {
                scraper::scrape_source(&self.renderer, descriptor, &self.denylist, &self.timing, &stamp)
                    .await
            }
        })
    }

    /// Feed-mode sources only.
    pub async fn collect_feeds(&self) -> Vec<RecallRecord> {
        feed::fetch_all_feeds(&self.fetcher, &self.registry, &RunStamp::now()).await
    }

    /// Scrape-mode sources only.
    pub async fn collect_scraped(&self) -> Vec<RecallRecord> {
        scraper::scrape_all_sources(
            &self.renderer,
            &self.registry,
            &self.denylist,
            &self.timing,
            &RunStamp::now(),
        )
        .await
    }

    /// Collect, then replace the stored snapshot. Only persistence errors escape.
    pub async fn run(&self, store: &dyn RecordStore) -> Result<AggregationRun, StoreError> {
        let run = self.collect().await;
        store.save(&run.records, run.finished_at)?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use super::*;
    use crate::db::SqliteStore;
    use crate::feed::tests::MapFetcher;
    use crate::registry::Access;
    use crate::scraper::tests::{example_source, index_page, quick_timing, MapRenderer, INDEX};

    const FDA_FEED: &str = "https://www.fda.gov/feeds/recalls.xml";

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }

    fn feed_source(name: &'static str, url: &'static str) -> SourceDescriptor {
        SourceDescriptor {
            name,
            category: "Food & Drugs",
            access: Access::Feed {
                url,
                home: "https://www.fda.gov/safety/recalls-market-withdrawals-safety-alerts",
            },
        }
    }

    fn registry() -> Registry {
        Registry::new(vec![
            feed_source("FDA Feed", FDA_FEED),
            feed_source("Dead Feed", "https://dead.example/rss"),
            example_source(),
        ])
    }

    fn aggregator(fetcher: MapFetcher, renderer: MapRenderer) -> Aggregator<MapFetcher, MapRenderer> {
        Aggregator::new(registry(), fetcher, renderer, Denylist::default(), quick_timing())
    }

    fn working() -> Aggregator<MapFetcher, MapRenderer> {
        let index = index_page(&["/recalls/chips"]);
        aggregator(
            MapFetcher::default().with(FDA_FEED, &fixture("fda_recalls.rss")),
            MapRenderer::new(&[
                (INDEX, index.as_str()),
                ("https://recalls.example/recalls/chips", fixture("fda_detail.html").as_str()),
            ]),
        )
    }

    #[tokio::test]
    async fn everything_down_still_returns_a_run() {
        let run = aggregator(MapFetcher::default(), MapRenderer::default()).collect().await;
        assert!(run.records.is_empty());
        assert_eq!(run.reports.len(), 3);
        assert_eq!(run.failed_sources(), 3);
    }

    #[tokio::test]
    async fn failures_are_isolated_per_source() {
        let run = working().collect().await;

        let by_name = |name: &str| run.reports.iter().find(|r| r.source == name).unwrap().clone();
        assert_eq!(by_name("FDA Feed").count, 3);
        assert!(by_name("Dead Feed").error.is_some());
        assert_eq!(by_name("Example Agency").count, 1);
        assert_eq!(run.records.len(), 4);
    }

    #[tokio::test]
    async fn records_are_sorted_absolute_and_dated() {
        let run = working().collect().await;

        let dates: Vec<NaiveDate> = run.records.iter().map(|r| r.date).collect();
        let mut sorted = dates.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(dates, sorted);

        for r in &run.records {
            assert!(r.link.starts_with("https://"), "relative link {}", r.link);
            let shown = serde_json::to_value(r).unwrap()["date"].as_str().unwrap().to_string();
            assert!(NaiveDate::parse_from_str(&shown, "%Y-%m-%d").is_ok());
            assert_eq!(shown.len(), 10);
        }
    }

    #[tokio::test]
    async fn unparsable_feed_date_becomes_today() {
        let run = working().collect().await;
        let undated = run
            .records
            .iter()
            .find(|r| r.title == feed::UNTITLED)
            .unwrap();
        assert_eq!(undated.date, run.finished_at.date_naive());
    }

    #[tokio::test]
    async fn ids_are_unique_within_a_run() {
        let run = working().collect().await;
        let mut ids: Vec<&str> = run.records.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), run.records.len());
    }

    #[tokio::test]
    async fn run_persists_the_snapshot() {
        let store = SqliteStore::in_memory().unwrap();
        let run = working().run(&store).await.unwrap();
        assert_eq!(store.load().unwrap(), run.records);
        assert_eq!(store.last_updated().unwrap(), Some(run.finished_at));
    }

    /// Accepts nothing; every write fails.
    struct BrokenStore(Mutex<usize>);

    impl RecordStore for BrokenStore {
        fn save(&self, _: &[RecallRecord], _: DateTime<Utc>) -> Result<(), StoreError> {
            *self.0.lock().unwrap() += 1;
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
        fn load(&self) -> Result<Vec<RecallRecord>, StoreError> {
            Ok(Vec::new())
        }
        fn last_updated(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
            Ok(None)
        }
        fn location(&self) -> String {
            "broken".to_string()
        }
    }

    #[tokio::test]
    async fn store_failure_reaches_the_caller() {
        let store = BrokenStore(Mutex::new(0));
        let result = working().run(&store).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert_eq!(*store.0.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn single_mode_collections() {
        let aggregator = working();
        let feeds = aggregator.collect_feeds().await;
        assert_eq!(feeds.len(), 3);
        assert!(feeds.iter().all(|r| r.source == "FDA Feed"));

        let scraped = aggregator.collect_scraped().await;
        assert_eq!(scraped.len(), 1);
        assert_eq!(scraped[0].source, "Example Agency");
    }

    #[tokio::test]
    async fn single_source_by_name() {
        let aggregator = working();
        assert_eq!(aggregator.collect_source("FDA Feed").await.unwrap().len(), 3);
        assert!(aggregator.collect_source("Dead Feed").await.unwrap().is_empty());
        assert!(matches!(
            aggregator.collect_source("Nobody").await,
            Err(RegistryError::NotFound(_))
        ));
    }
}
