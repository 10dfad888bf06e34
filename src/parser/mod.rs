pub mod dates;
pub mod extract;
pub mod links;

use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Node, Selector};

use crate::record::clean_field;

static HEADINGS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1, h2, h3").unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static BOLD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("strong, b").unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static TIME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("time[datetime]").unwrap());
static PUBLISHED_META: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="article:published_time"], meta[name="date"]"#).unwrap()
});

const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];

/// A parsed page. Every accessor degrades to empty/`None` on missing structure.
///
/// Holds a `scraper::Html`, which is not `Send`: parse and extract inside a
/// synchronous block, never across an `.await`.
pub struct Document {
    html: Html,
}

/// An anchor as written in the markup: raw `href` plus its visible text.
#[derive(Debug, Clone)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Document {
            html: Html::parse_document(markup),
        }
    }

    /// Non-empty `h1`-`h3` texts in document order.
    pub fn headings(&self) -> Vec<String> {
        self.html
            .select(&HEADINGS)
            .filter_map(|el| clean_field(&el.text().collect::<String>()))
            .collect()
    }

    /// Non-empty paragraph texts in document order.
    pub fn paragraphs(&self) -> Vec<String> {
        self.html
            .select(&PARAGRAPHS)
            .filter_map(|el| clean_field(&el.text().collect::<String>()))
            .collect()
    }

    /// Visible body text, one line per text node. Script and style bodies are skipped.
    pub fn body_text(&self) -> String {
        let root = self
            .html
            .select(&BODY)
            .next()
            .unwrap_or_else(|| self.html.root_element());
        visible_text(root)
    }

    pub fn anchors(&self) -> Vec<Anchor> {
        self.html
            .select(&ANCHORS)
            .filter_map(|el| {
                let href = el.value().attr("href")?.trim().to_string();
                let text = el.text().collect::<String>();
                Some(Anchor {
                    href,
                    text: clean_field(&text).unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Value next to a bold label such as `<strong>Product:</strong> Veggie Chips`.
    ///
    /// Tries the label element's own text after a colon, then the rest of its
    /// parent's text, then the parent's next sibling element (`<dt>/<dd>` layouts).
    pub fn labelled_value(&self, label: &str) -> Option<String> {
        for el in self.html.select(&BOLD) {
            let own = el.text().collect::<String>();
            if !own.contains(label) {
                continue;
            }

            if let Some((_, inline)) = own.split_once(':') {
                if let Some(v) = clean_field(inline) {
                    return Some(v);
                }
            }

            let Some(parent) = el.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            let parent_text = parent.text().collect::<String>();
            if let Some((_, rest)) = parent_text.split_once(own.as_str()) {
                let rest = rest.trim_start_matches(|c: char| c == ':' || c.is_whitespace());
                let line = rest.lines().next().unwrap_or("");
                if let Some(v) = clean_field(line) {
                    return Some(v);
                }
            }

            let sibling = parent.next_siblings().find_map(ElementRef::wrap);
            if let Some(v) = sibling.and_then(|s| clean_field(&s.text().collect::<String>())) {
                return Some(v);
            }
        }
        None
    }

    /// Publication date from `<time datetime>` or a published-time meta tag.
    pub fn published_date(&self) -> Option<NaiveDate> {
        let from_time = self
            .html
            .select(&TIME)
            .filter_map(|el| el.value().attr("datetime"))
            .find_map(dates::parse);
        from_time.or_else(|| {
            self.html
                .select(&PUBLISHED_META)
                .filter_map(|el| el.value().attr("content"))
                .find_map(dates::parse)
        })
    }
}

/// Text content of an HTML fragment (feed summaries often carry markup).
pub fn fragment_text(fragment: &str) -> Option<String> {
    let html = Html::parse_fragment(fragment);
    clean_field(&visible_text(html.root_element()))
}

fn visible_text(root: ElementRef) -> String {
    let mut lines = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(e) => HIDDEN.contains(&e.name()),
            _ => false,
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>t</title>
        <meta property="article:published_time" content="2024-04-02T09:00:00Z"></head>
        <body>
          <nav><a href="/home">Home</a></nav>
          <h1>  Acme Recalls
              Veggie Chips </h1>
          <p></p>
          <p>Acme Foods is recalling chips because of undeclared milk.</p>
          <p><strong>Product:</strong> Veggie Chips 5oz</p>
          <dl><dt><b>Company Name</b></dt><dd>Acme Foods LLC</dd></dl>
          <script>document.getElementById('x').innerText = 'Company: nope';</script>
        </body></html>"#;

    #[test]
    fn headings_and_paragraphs_are_cleaned() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.headings(), ["Acme Recalls Veggie Chips"]);
        let paragraphs = doc.paragraphs();
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].starts_with("Acme Foods is recalling"));
    }

    #[test]
    fn labelled_value_from_parent_text() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.labelled_value("Product").as_deref(), Some("Veggie Chips 5oz"));
    }

    #[test]
    fn labelled_value_from_sibling_element() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.labelled_value("Company").as_deref(), Some("Acme Foods LLC"));
    }

    #[test]
    fn labelled_value_missing_is_none() {
        let doc = Document::parse("<p>nothing bold here</p>");
        assert_eq!(doc.labelled_value("Product"), None);
    }

    #[test]
    fn body_text_skips_scripts() {
        let doc = Document::parse(PAGE);
        let text = doc.body_text();
        assert!(text.contains("Veggie Chips 5oz"));
        assert!(!text.contains("getElementById"));
    }

    #[test]
    fn published_date_from_meta() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.published_date(), "2024-04-02".parse().ok());
    }

    #[test]
    fn published_date_prefers_time_element() {
        let doc = Document::parse(r#"<body><time datetime="2023-12-24">Dec 24</time></body>"#);
        assert_eq!(doc.published_date(), "2023-12-24".parse().ok());
    }

    #[test]
    fn fragment_text_strips_markup() {
        assert_eq!(
            fragment_text("<p>Acme is recalling <b>chips</b> &amp; dip.</p>").as_deref(),
            Some("Acme is recalling chips & dip.")
        );
        assert_eq!(fragment_text("plain words").as_deref(), Some("plain words"));
        assert_eq!(fragment_text("<br/>"), None);
    }

    #[test]
    fn anchors_keep_raw_href() {
        let doc = Document::parse(PAGE);
        let anchors = doc.anchors();
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].href, "/home");
        assert_eq!(anchors[0].text, "Home");
    }
}
