use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One normalized recall entry.
///
/// `date` serializes as `YYYY-MM-DD`. Optional fields are either absent or a
/// trimmed, non-empty value that passed denylist filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallRecord {
    pub id: String,
    pub title: String,
    pub link: String,
    pub date: NaiveDate,
    pub source: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall_reason: Option<String>,
}

/// Which adapter produced an id; keeps feed and scrape ids apart for one source.
#[derive(Debug, Clone, Copy)]
pub enum IdKind {
    Feed,
    Specific,
}

/// Per-run id generator: `{slug}-{kind}-{run_millis}-{n}`.
///
/// Ids are unique within a run only. Two runs over the same upstream recall
/// produce different ids.
#[derive(Debug, Clone, Copy)]
pub struct RunStamp {
    pub millis: i64,
    pub today: NaiveDate,
}

impl RunStamp {
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        RunStamp {
            millis: now.timestamp_millis(),
            today: now.date_naive(),
        }
    }

    pub fn id(&self, source: &str, kind: IdKind, n: usize) -> String {
        let kind = match kind {
            IdKind::Feed => "feed",
            IdKind::Specific => "specific",
        };
        format!("{}-{}-{}-{}", slugify(source), kind, self.millis, n)
    }
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Newest first. `sort_by` is stable, so equal dates keep insertion order.
pub fn sort_newest_first(records: &mut [RecallRecord]) {
    records.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Trim and collapse whitespace; `None` when nothing is left.
pub fn clean_field(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Presentation filter: exact source / category (case-insensitive) and a
/// free-text query over title and description.
#[derive(Debug, Clone, Default)]
pub struct RecallFilter {
    pub source: Option<String>,
    pub category: Option<String>,
    pub query: Option<String>,
}

impl RecallFilter {
    pub fn matches(&self, record: &RecallRecord) -> bool {
        let same = |want: &Option<String>, have: &str| {
            want.as_deref().map_or(true, |w| w.eq_ignore_ascii_case(have))
        };
        if !same(&self.source, &record.source) || !same(&self.category, &record.category) {
            return false;
        }
        let Some(query) = self.query.as_deref().map(str::to_lowercase) else {
            return true;
        };
        record.title.to_lowercase().contains(&query)
            || record
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }
}

#[cfg(test)]
pub(crate) fn sample(id: &str, date: &str) -> RecallRecord {
    RecallRecord {
        id: id.to_string(),
        title: format!("Recall {}", id),
        link: "https://www.fda.gov/safety/recalls-market-withdrawals-safety-alerts".to_string(),
        date: date.parse().unwrap(),
        source: "FDA".to_string(),
        category: "Food & Drugs".to_string(),
        description: Some("Undeclared allergen in snack bars".to_string()),
        product_name: None,
        manufacturer: Some("Acme Foods".to_string()),
        recall_reason: None,
    }
}
