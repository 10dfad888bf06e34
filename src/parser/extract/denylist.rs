/// Boilerplate fragments that mark an extracted value as wrong.
///
/// Matching is a case-insensitive substring test. The list is shared by every
/// source; extra fragments come from settings (`denylist_extra`). Script
/// keywords only match at the start of a word.
#[derive(Debug, Clone)]
pub struct Denylist {
    fragments: Vec<String>,
    keywords: Vec<String>,
}

const BUILTIN: &[&str] = &[
    // agency and organization names picked up from page chrome
    "safety commission",
    "commission",
    "operating status",
    // addresses and report banners
    "1200 new jersey",
    "2026 report",
    "dating",
    // navigation and pagination
    "recalls…",
    "recalls...",
    "next page",
    "previous page",
    "page 1 of",
    "skip to main content",
    "load more",
    // script residue
    "document.getelementbyid",
    "javascript:",
    "function(",
    "window.",
];

const KEYWORDS: &[&str] = &["var "];

impl Default for Denylist {
    fn default() -> Self {
        Denylist {
            fragments: BUILTIN.iter().map(|f| f.to_string()).collect(),
            keywords: KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Denylist {
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for fragment in extra {
            let fragment = fragment.as_ref().trim().to_lowercase();
            if !fragment.is_empty() && !self.fragments.contains(&fragment) {
                self.fragments.push(fragment);
            }
        }
        self
    }

    pub fn rejects(&self, value: &str) -> bool {
        let lower = value.to_lowercase();
        self.fragments.iter().any(|f| lower.contains(f.as_str()))
            || self.keywords.iter().any(|k| starts_word(&lower, k))
    }

    pub fn len(&self) -> usize {
        self.fragments.len() + self.keywords.len()
    }
}

fn starts_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_fragments_reject_boilerplate() {
        let deny = Denylist::default();
        assert!(deny.rejects("U.S. Consumer Product Safety Commission"));
        assert!(deny.rejects("4330 East West Highway, Federal Trade COMMISSION"));
        assert!(deny.rejects("document.getElementById('banner')"));
        assert!(deny.rejects("Operating Status"));
        assert!(!deny.rejects("Acme Foods LLC"));
    }

    #[test]
    fn script_keywords_match_only_at_word_start() {
        let deny = Denylist::default();
        assert!(deny.rejects("var banner = 1;"));
        assert!(deny.rejects("x(); var y"));
        assert!(!deny.rejects("Bolivar Foods"));
        assert!(!deny.rejects("Navar Kitchen Supply"));
    }

    #[test]
    fn extra_fragments_extend_without_duplicates() {
        let base = Denylist::default().len();
        let deny = Denylist::default().with_extra(["  Cookie Settings ", "commission", ""]);
        assert_eq!(deny.len(), base + 1);
        assert!(deny.rejects("Manage cookie settings"));
    }
}
