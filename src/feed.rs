use quick_xml::events::{BytesStart, Event};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::net::Fetch;
use crate::parser::{dates, fragment_text, links};
use crate::record::{clean_field, sort_newest_first, IdKind, RecallRecord, RunStamp};
use crate::registry::{Access, AccessMode, Registry, SourceDescriptor};

pub const UNTITLED: &str = "No Title";

/// Raw fields of one RSS `<item>` or Atom `<entry>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
    Description,
    Summary,
    Content,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Field> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"pubDate" | b"published" | b"date" | b"issued" => Some(Field::Published),
            b"updated" | b"modified" => Some(Field::Updated),
            b"description" => Some(Field::Description),
            b"summary" => Some(Field::Summary),
            b"content" | b"encoded" => Some(Field::Content),
            _ => None,
        }
    }
}

impl FeedItem {
    /// First occurrence of each field wins.
    fn set(&mut self, field: Field, text: String) {
        let Some(value) = clean_field(&text) else {
            return;
        };
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::Description => &mut self.description,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    /// Atom `<link href rel>`; only `alternate` or rel-less links count.
    fn take_link_attr(&mut self, e: &BytesStart) -> Result<(), quick_xml::Error> {
        if self.link.is_some() {
            return Ok(());
        }
        let rel = match e.try_get_attribute("rel")? {
            Some(attr) => Some(attr.unescape_value()?.into_owned()),
            None => None,
        };
        if rel.as_deref().is_some_and(|r| r != "alternate") {
            return Ok(());
        }
        if let Some(href) = e.try_get_attribute("href")? {
            self.link = clean_field(&href.unescape_value()?);
        }
        Ok(())
    }
}

/// Parse RSS 2.0 / RSS 1.0 / Atom into items. Errors on malformed XML or a
/// document that is not a syndication feed at all.
pub fn parse_items(xml: &str) -> Result<Vec<FeedItem>, String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut items = Vec::new();
    let mut item: Option<FeedItem> = None;
    let mut depth = 0usize;
    let mut field: Option<(Field, String)> = None;
    let mut is_feed = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match item.as_mut() {
                    None => match name.as_ref() {
                        b"rss" | b"feed" | b"RDF" => is_feed = true,
                        b"item" | b"entry" => {
                            item = Some(FeedItem::default());
                            depth = 0;
                        }
                        _ => {}
                    },
                    Some(current) => {
                        depth += 1;
                        if depth == 1 {
                            if name.as_ref() == b"link" {
                                current.take_link_attr(&e).map_err(|e| e.to_string())?;
                            }
                            field = Field::from_local_name(name.as_ref()).map(|f| (f, String::new()));
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(current) = item.as_mut() {
                    if depth == 0 && e.local_name().as_ref() == b"link" {
                        current.take_link_attr(&e).map_err(|e| e.to_string())?;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, text)) = field.as_mut() {
                    match e.unescape() {
                        Ok(s) => text.push_str(&s),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(current) = item.as_mut() {
                    if depth == 0 {
                        items.extend(item.take());
                    } else {
                        if depth == 1 {
                            if let Some((f, text)) = field.take() {
                                current.set(f, text);
                            }
                        }
                        depth -= 1;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    if !is_feed {
        return Err("no rss/feed root element".to_string());
    }
    Ok(items)
}

/// Normalize one item. Missing or bad values fall back: placeholder title,
/// today's date, the source's home link.
pub fn to_record(
    item: FeedItem,
    descriptor: &SourceDescriptor,
    base: &Url,
    home: &str,
    stamp: &RunStamp,
    n: usize,
) -> RecallRecord {
    let title = item.title.unwrap_or_else(|| UNTITLED.to_string());

    let raw_date = item.published.or(item.updated);
    let date = match raw_date.as_deref().map(|raw| (raw, dates::parse(raw))) {
        Some((_, Some(date))) => date,
        Some((raw, None)) => {
            warn!(source = descriptor.name, title = %title, raw, "Invalid date format, using current date");
            stamp.today
        }
        None => stamp.today,
    };

    let link = item
        .link
        .as_deref()
        .and_then(|href| links::resolve(base, href))
        .map(String::from)
        .unwrap_or_else(|| home.to_string());

    let description = item
        .description
        .or(item.summary)
        .or(item.content)
        .and_then(|d| fragment_text(&d));

    RecallRecord {
        id: stamp.id(descriptor.name, IdKind::Feed, n),
        title,
        link,
        date,
        source: descriptor.name.to_string(),
        category: descriptor.category.to_string(),
        description,
        product_name: None,
        manufacturer: None,
        recall_reason: None,
    }
}

/// Fetch and normalize one feed source; errors are the caller's to absorb.
pub async fn try_fetch_feed<F: Fetch>(
    fetcher: &F,
    descriptor: &SourceDescriptor,
    stamp: &RunStamp,
) -> Result<Vec<RecallRecord>, FetchError> {
    let Access::Feed { url, home } = descriptor.access else {
        return Ok(Vec::new());
    };
    let base = Url::parse(url).map_err(|e| FetchError::Feed {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    info!(source = descriptor.name, url, "Fetching feed");
    let xml = fetcher.get_text(url).await?;
    let items = parse_items(&xml).map_err(|message| FetchError::Feed {
        url: url.to_string(),
        message,
    })?;
    debug!(source = descriptor.name, items = items.len(), "Parsed feed");

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(n, item)| to_record(item, descriptor, &base, home, stamp, n))
        .collect())
}

/// Like [`try_fetch_feed`], but a failed source yields an empty list.
pub async fn fetch_feed<F: Fetch>(
    fetcher: &F,
    descriptor: &SourceDescriptor,
    stamp: &RunStamp,
) -> Vec<RecallRecord> {
    match try_fetch_feed(fetcher, descriptor, stamp).await {
        Ok(records) => records,
        Err(e) => {
            warn!(source = descriptor.name, error = %e, "Error fetching feed");
            Vec::new()
        }
    }
}

/// Every feed-mode source in registry order, newest first.
pub async fn fetch_all_feeds<F: Fetch>(
    fetcher: &F,
    registry: &Registry,
    stamp: &RunStamp,
) -> Vec<RecallRecord> {
    let mut all = Vec::new();
    for descriptor in registry.by_mode(AccessMode::Feed) {
        all.extend(fetch_feed(fetcher, descriptor, stamp).await);
    }
    sort_newest_first(&mut all);
    all
}
