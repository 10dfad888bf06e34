use super::{Access, Profile, ScrapeRules, SourceDescriptor};

const RECALLS: &str = "/recalls/";
const SAFETY: &str = "/safety/";
const ALERTS: &str = "/alerts/";
const SUPPORT: &str = "/support/";

fn feed(name: &'static str, category: &'static str, url: &'static str, home: &'static str) -> SourceDescriptor {
    SourceDescriptor {
        name,
        category,
        access: Access::Feed { url, home },
    }
}

#[allow(clippy::too_many_arguments)]
fn scrape(
    name: &'static str,
    category: &'static str,
    index_url: &'static str,
    link_paths: &'static [&'static str],
    link_words: &'static [&'static str],
    link_cap: usize,
    topic_words: &'static [&'static str],
    placeholder_title: &'static str,
    profile: Profile,
) -> SourceDescriptor {
    SourceDescriptor {
        name,
        category,
        access: Access::Scrape(ScrapeRules {
            index_url,
            link_paths,
            link_words,
            link_cap,
            topic_words,
            placeholder_title,
            profile,
        }),
    }
}

/// Feeds first, then scraped sites; aggregation visits them in this order.
pub(super) fn sources() -> Vec<SourceDescriptor> {
    use Profile::*;

    vec![
        feed(
            "FDA Feed",
            "Food & Drugs",
            "https://www.fda.gov/about-fda/contact-fda/stay-informed/rss-feeds/recalls/rss.xml",
            "https://www.fda.gov/safety/recalls-market-withdrawals-safety-alerts",
        ),
        feed(
            "CPSC Feed",
            "Consumer Products",
            "https://www.cpsc.gov/Newsroom/CPSC-RSS-Feed/Recalls-RSS",
            "https://www.cpsc.gov/Recalls",
        ),
        feed(
            "USDA Feed",
            "Food Safety",
            "https://www.fsis.usda.gov/fsis-content/rss/recalls.xml",
            "https://www.fsis.usda.gov/recalls-alerts",
        ),
        // ── Agencies ──
        scrape(
            "FDA",
            "Food & Drugs",
            "https://www.fda.gov/safety/recalls-market-withdrawals-safety-alerts",
            &[RECALLS, "/withdrawals/", ALERTS, SAFETY],
            &["recall", "withdrawal", "alert", "safety"],
            5,
            &["recall", "withdrawal", "alert", "product", "company"],
            "FDA Recall Alert",
            Agency,
        ),
        scrape(
            "CPSC",
            "Consumer Products",
            "https://www.cpsc.gov/Recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "product"],
            5,
            &["recall", "safety", "product", "consumer"],
            "CPSC Recall Alert",
            Agency,
        ),
        scrape(
            "NHTSA",
            "Vehicles",
            "https://www.nhtsa.gov/recalls",
            &[RECALLS, "/vehicle/"],
            &["recall", "vehicle", "safety"],
            5,
            &["vehicle", "model", "make", "year", "safety", "defect"],
            "NHTSA Vehicle Recall",
            Vehicle,
        ),
        scrape(
            "USDA",
            "Food Safety",
            "https://www.fsis.usda.gov/recalls-alerts",
            &[RECALLS, ALERTS],
            &["recall", "alert", "food"],
            5,
            &["recall", "alert", "food", "safety"],
            "USDA Food Recall Alert",
            Agency,
        ),
        scrape(
            "EPA",
            "Environmental",
            "https://www.epa.gov/recalls",
            &[RECALLS, ALERTS],
            &["recall", "environmental", "safety"],
            3,
            &["recall", "environmental", "safety", "chemical"],
            "EPA Environmental Recall Alert",
            Agency,
        ),
        scrape(
            "FTC",
            "Consumer Protection",
            "https://www.ftc.gov/news-events/topics/consumer-alerts",
            &[ALERTS, RECALLS],
            &["recall", "alert", "consumer"],
            3,
            &["recall", "alert", "consumer", "safety"],
            "FTC Consumer Alert",
            Agency,
        ),
        // ── Manufacturers and retailers ──
        scrape(
            "Toyota",
            "Vehicles",
            "https://www.toyota.com/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "vehicle"],
            3,
            &["recall", "safety", "vehicle", "toyota"],
            "Toyota Vehicle Recall",
            Brand,
        ),
        scrape(
            "Honda",
            "Vehicles",
            "https://www.honda.com/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "vehicle"],
            3,
            &["recall", "safety", "vehicle", "honda"],
            "Honda Vehicle Recall",
            Brand,
        ),
        scrape(
            "Walmart",
            "Retail",
            "https://www.walmart.com/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "product"],
            3,
            &["recall", "safety", "product", "walmart"],
            "Walmart Product Recall",
            Brand,
        ),
        scrape(
            "Consumer Reports",
            "Consumer News",
            "https://www.consumerreports.org/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "product"],
            3,
            &["recall", "safety", "product", "consumer"],
            "Consumer Reports Recall Alert",
            Agency,
        ),
        scrape(
            "Ford",
            "Vehicles",
            "https://www.ford.com/support/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "vehicle"],
            3,
            &["recall", "safety", "vehicle", "ford"],
            "Ford Vehicle Recall",
            Brand,
        ),
        scrape(
            "General Motors",
            "Vehicles",
            "https://www.gm.com/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "vehicle"],
            3,
            &["recall", "safety", "vehicle", "gm"],
            "GM Vehicle Recall",
            Brand,
        ),
        scrape(
            "Target",
            "Retail",
            "https://www.target.com/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "product"],
            3,
            &["recall", "safety", "product", "target"],
            "Target Product Recall",
            Brand,
        ),
        scrape(
            "Amazon",
            "Retail",
            "https://www.amazon.com/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "product"],
            3,
            &["recall", "safety", "product", "amazon"],
            "Amazon Product Recall",
            Brand,
        ),
        scrape(
            "Home Depot",
            "Retail",
            "https://www.homedepot.com/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "product"],
            3,
            &["recall", "safety", "product", "home depot"],
            "Home Depot Product Recall",
            Brand,
        ),
        // ── Consumer news ──
        scrape(
            "Consumer Affairs",
            "Consumer News",
            "https://www.consumeraffairs.com/recalls",
            &[RECALLS, SAFETY],
            &["recall", "safety", "product"],
            3,
            &["recall", "safety", "product", "consumer"],
            "Consumer Affairs Recall Alert",
            Agency,
        ),
        scrape(
            "Better Business Bureau",
            "Consumer News",
            "https://www.bbb.org/recalls",
            &[RECALLS, ALERTS],
            &["recall", "alert", "consumer"],
            3,
            &["recall", "alert", "consumer", "safety"],
            "BBB Consumer Alert",
            Agency,
        ),
        scrape(
            "Food Safety News",
            "Food Safety",
            "https://www.foodsafetynews.com/tag/recalls",
            &[RECALLS, "/food/"],
            &["recall", "food", "safety"],
            3,
            &["recall", "food", "safety", "contamination"],
            "Food Safety News Recall Alert",
            Agency,
        ),
        // ── Other agencies ──
        scrape(
            "DOT",
            "Transportation",
            "https://www.transportation.gov/",
            &[SAFETY, RECALLS],
            &["safety", "recall"],
            3,
            &["recall", "safety", "transportation"],
            "DOT Safety Alert",
            Agency,
        ),
        scrape(
            "ATF",
            "Firearms",
            "https://www.atf.gov/",
            &[SAFETY, RECALLS],
            &["safety", "recall"],
            3,
            &["recall", "safety", "firearm"],
            "ATF Safety Alert",
            Agency,
        ),
        scrape(
            "USCG",
            "Marine Safety",
            "https://www.uscg.mil/",
            &[SAFETY, RECALLS],
            &["safety", "recall"],
            3,
            &["recall", "safety", "marine"],
            "USCG Safety Alert",
            Agency,
        ),
        // ── Brand support sites ──
        scrape(
            "Tesla",
            "Vehicles",
            "https://www.tesla.com/",
            &[SUPPORT, SAFETY],
            &["safety", "recall"],
            3,
            &["recall", "safety", "tesla"],
            "Tesla Safety Alert",
            Brand,
        ),
        scrape(
            "BMW",
            "Vehicles",
            "https://www.bmwusa.com/",
            &[SUPPORT, SAFETY],
            &["safety", "recall"],
            3,
            &["recall", "safety", "bmw"],
            "BMW Safety Alert",
            Brand,
        ),
        scrape(
            "Mercedes-Benz",
            "Vehicles",
            "https://www.mbusa.com/",
            &[SUPPORT, SAFETY],
            &["safety", "recall"],
            3,
            &["recall", "safety", "mercedes"],
            "Mercedes-Benz Safety Alert",
            Brand,
        ),
        scrape(
            "Apple",
            "Electronics",
            "https://support.apple.com/",
            &[SAFETY, "/recall/"],
            &["safety", "recall"],
            3,
            &["recall", "safety", "apple", "iphone"],
            "Apple Safety Alert",
            Brand,
        ),
    ]
}
