use std::collections::HashSet;

use reqwest::Url;

use super::Document;

const SKIP_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Candidate detail pages on an index page.
///
/// An anchor qualifies when its resolved URL contains one of `paths` or its
/// text contains one of `words` (case-insensitive). Results keep document
/// order, are deduplicated, exclude the index page itself and stop at `cap`.
pub fn discover(
    doc: &Document,
    base: &Url,
    paths: &[&str],
    words: &[&str],
    cap: usize,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in doc.anchors() {
        if links.len() >= cap {
            break;
        }
        let Some(url) = resolve(base, &anchor.href) else {
            continue;
        };
        if url == *base || seen.contains(url.as_str()) {
            continue;
        }

        let href = url.as_str().to_lowercase();
        let text = anchor.text.to_lowercase();
        let by_path = paths.iter().any(|p| href.contains(&p.to_lowercase()));
        let by_text = words.iter().any(|w| text.contains(w));
        if by_path || by_text {
            seen.insert(url.as_str().to_string());
            links.push(url.into());
        }
    }

    links
}

/// Absolute http(s) URL for an `href`, without its fragment.
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_lowercase();
    if SKIP_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
