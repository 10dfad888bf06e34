mod aggregate;
mod api;
mod db;
mod error;
mod feed;
mod net;
mod parser;
mod record;
mod registry;
mod render;
mod scraper;
mod settings;
mod store;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::debug;

use aggregate::Aggregator;
use net::HttpFetcher;
use parser::extract::denylist::Denylist;
use record::{RecallFilter, RecallRecord};
use registry::Registry;
use render::AnyRenderer;
use settings::Settings;
use store::RecordStore;

#[derive(Parser)]
#[command(name = "recall_scraper", about = "Product-safety recall aggregator (feeds + scraped pages)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Visit every source and replace the stored snapshot
    Run,
    /// Feed sources only, then replace the stored snapshot
    Feeds,
    /// Scrape sources only, then replace the stored snapshot
    Scrape,
    /// Fetch one source and print what it yields, without saving
    Probe {
        /// Source name as listed by `sources`
        name: String,
    },
    /// Print stored recalls
    List {
        /// Only this source (e.g. "FDA", "CPSC Feed")
        #[arg(short, long)]
        source: Option<String>,
        /// Only this category (e.g. "Vehicles")
        #[arg(short, long)]
        category: Option<String>,
        /// Case-insensitive search over title and description
        #[arg(short, long)]
        query: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show snapshot size and age
    Status,
    /// Print the source registry
    Sources,
    /// Serve the JSON API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Run => {
            let store = open_store(&settings)?;
            let aggregator = build_aggregator(&settings)?.with_progress();
            let run = aggregator.run(store.as_ref()).await?;

            println!("{:<28} | {:<6} | {:>5} | {}", "Source", "Mode", "Count", "Error");
            println!("{}", "-".repeat(80));
            for r in &run.reports {
                let error = r.error.as_deref().map(|e| truncate(e, 36)).unwrap_or_default();
                println!("{:<28} | {:<6} | {:>5} | {}", r.source, r.mode, r.count, error);
            }
            println!(
                "\nSaved {} recalls from {} sources ({} failed) to {}",
                run.records.len(),
                run.reports.len(),
                run.failed_sources(),
                store.location()
            );
            Ok(())
        }
        Commands::Feeds => {
            let store = open_store(&settings)?;
            let records = build_aggregator(&settings)?.collect_feeds().await;
            store.save(&records, Utc::now())?;
            println!("Saved {} feed recalls to {}", records.len(), store.location());
            Ok(())
        }
        Commands::Scrape => {
            let store = open_store(&settings)?;
            let records = build_aggregator(&settings)?.collect_scraped().await;
            store.save(&records, Utc::now())?;
            println!("Saved {} scraped recalls to {}", records.len(), store.location());
            Ok(())
        }
        Commands::Probe { name } => {
            let records = build_aggregator(&settings)?.collect_source(&name).await?;
            for r in &records {
                println!("{} | {} | {}", r.date, truncate(&r.title, 60), r.link);
                if let Some(product) = &r.product_name {
                    println!("    product:      {}", product);
                }
                if let Some(manufacturer) = &r.manufacturer {
                    println!("    manufacturer: {}", manufacturer);
                }
                if let Some(reason) = &r.recall_reason {
                    println!("    reason:       {}", truncate(reason, 80));
                }
            }
            println!("\n{} recalls from {}", records.len(), name);
            Ok(())
        }
        Commands::List {
            source,
            category,
            query,
            limit,
        } => {
            let store = open_store(&settings)?;
            let filter = RecallFilter {
                source,
                category,
                query,
            };
            let records: Vec<RecallRecord> = store
                .load()?
                .into_iter()
                .filter(|r| filter.matches(r))
                .collect();
            if records.is_empty() {
                println!("No recalls found. Run 'run' first or loosen the filters.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<10} | {:<18} | {:<48} | {:<24}",
                "#", "Date", "Source", "Title", "Manufacturer"
            );
            println!("{}", "-".repeat(115));
            for (i, r) in records.iter().take(limit).enumerate() {
                let manufacturer = r.manufacturer.as_deref().unwrap_or("-");
                println!(
                    "{:>3} | {:<10} | {:<18} | {:<48} | {:<24}",
                    i + 1,
                    r.date,
                    truncate(&r.source, 18),
                    truncate(&r.title, 48),
                    truncate(manufacturer, 24)
                );
            }
            println!("\n{} of {} recalls shown", records.len().min(limit), records.len());
            Ok(())
        }
        Commands::Status => {
            let store = open_store(&settings)?;
            let count = store.load()?.len();
            let last = store
                .last_updated()?
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".into());
            println!("Recalls:      {}", count);
            println!("Last updated: {}", last);
            println!("Store:        {}", store.location());
            Ok(())
        }
        Commands::Sources => {
            let registry = Registry::builtin();
            println!("{:<24} | {:<6} | {:<18} | {}", "Source", "Mode", "Category", "URL");
            println!("{}", "-".repeat(110));
            for s in registry.list_sources() {
                println!("{:<24} | {:<6} | {:<18} | {}", s.name, s.mode(), s.category, s.url());
            }
            println!("\n{} sources", registry.list_sources().len());
            Ok(())
        }
        Commands::Serve => {
            let state = Arc::new(api::AppState {
                store: open_store(&settings)?,
                aggregator: build_aggregator(&settings)?,
            });
            api::serve(&settings.listen, state)
                .await
                .with_context(|| format!("serving on {}", settings.listen))
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn RecordStore>> {
    store::open_store(settings)
        .with_context(|| format!("opening store at {}", settings.store_path.display()))
}

fn build_aggregator(settings: &Settings) -> anyhow::Result<Aggregator<HttpFetcher, AnyRenderer>> {
    let fetcher = HttpFetcher::new(&settings.user_agent, settings.feed_timeout())?;
    let page_fetcher = fetcher.with_timeout(Duration::from_secs(settings.index_timeout_secs));
    let renderer = AnyRenderer::from_settings(settings.spider_api_key.as_deref(), page_fetcher);
    let denylist = Denylist::default().with_extra(&settings.denylist_extra);
    debug!(fragments = denylist.len(), "Denylist ready");

    Ok(Aggregator::new(
        Registry::builtin(),
        fetcher,
        renderer,
        denylist,
        settings.scrape_timing(),
    ))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
