// src/extract/stats.rs
//! Statistics scraping strategies, tried in order of structural confidence.
//! The first strategy that moves any counter off the configured defaults
//! wins the pass.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::types::CommunityStats;

static SEL_DATA_ATTR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-stat], [data-count]").expect("static selector"));
static SEL_META: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name], meta[property]").expect("static selector"));

// Conventional class names seen on gallery sites for each counter.
static SEL_CLASS_MEMES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".meme-count, .memes-count, .total-memes, .stat-memes").expect("static selector")
});
static SEL_CLASS_VIEWS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".view-count, .views-count, .total-views, .stat-views").expect("static selector")
});
static SEL_CLASS_ARTISTS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".artist-count, .artists-count, .total-artists, .stat-artists")
        .expect("static selector")
});

static RE_LEADING_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([\d,]+)").expect("static regex"));
static RE_MEMES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d,]+)\s*memes?\b").expect("static regex"));
static RE_VIEWS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d,]+)\s*views?\b").expect("static regex"));
static RE_ARTISTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d,]+)\s*artists?\b").expect("static regex"));

/// Run the strategy chain. Returns the defaults untouched when nothing in
/// the document matched.
pub fn extract_stats(doc: &Html, defaults: &CommunityStats) -> CommunityStats {
    type Strategy = fn(&Html, &CommunityStats) -> CommunityStats;
    const STRATEGIES: [(&str, Strategy); 4] = [
        ("data-attributes", from_data_attributes),
        ("class-names", from_class_names),
        ("text-scan", from_text_scan),
        ("meta-tags", from_meta_tags),
    ];

    for (name, strategy) in STRATEGIES {
        let candidate = strategy(doc, defaults);
        if candidate != *defaults {
            tracing::debug!(strategy = name, "stats strategy matched");
            return candidate;
        }
    }
    tracing::debug!("no stats strategy matched, using placeholder defaults");
    *defaults
}

/// Regex-only salvage over a raw string, for when the document tree is
/// unusable. Only memes and views are recoverable this way.
pub fn scan_text_stats(raw: &str, defaults: &CommunityStats) -> CommunityStats {
    let mut out = *defaults;
    if let Some(n) = first_match(&RE_MEMES, raw) {
        out.total_memes = n;
    }
    if let Some(n) = first_match(&RE_VIEWS, raw) {
        out.total_views = n;
    }
    out
}

fn from_data_attributes(doc: &Html, defaults: &CommunityStats) -> CommunityStats {
    let mut out = *defaults;
    for el in doc.select(&SEL_DATA_ATTR) {
        let label = el
            .attr("data-stat")
            .or_else(|| el.attr("data-count"))
            .unwrap_or_default()
            .to_ascii_lowercase();
        let text: String = el.text().collect();
        let Some(n) = leading_int(&text) else { continue };
        if label.contains("meme") {
            out.total_memes = n;
        } else if label.contains("view") {
            out.total_views = n;
        } else if label.contains("artist") {
            out.total_artists = n;
        }
    }
    out
}

fn from_class_names(doc: &Html, defaults: &CommunityStats) -> CommunityStats {
    let mut out = *defaults;
    if let Some(n) = first_selected_int(doc, &SEL_CLASS_MEMES) {
        out.total_memes = n;
    }
    if let Some(n) = first_selected_int(doc, &SEL_CLASS_VIEWS) {
        out.total_views = n;
    }
    if let Some(n) = first_selected_int(doc, &SEL_CLASS_ARTISTS) {
        out.total_artists = n;
    }
    out
}

fn from_text_scan(doc: &Html, defaults: &CommunityStats) -> CommunityStats {
    let text = doc.root_element().text().collect::<Vec<_>>().join(" ");
    let mut out = scan_text_stats(&text, defaults);
    if let Some(n) = first_match(&RE_ARTISTS, &text) {
        out.total_artists = n;
    }
    out
}

fn from_meta_tags(doc: &Html, defaults: &CommunityStats) -> CommunityStats {
    let mut out = *defaults;
    for el in doc.select(&SEL_META) {
        let key = el
            .attr("name")
            .or_else(|| el.attr("property"))
            .unwrap_or_default()
            .to_ascii_lowercase();
        let Some(content) = el.attr("content") else { continue };
        let Some(n) = leading_int(content) else { continue };
        if key.contains("meme") {
            out.total_memes = n;
        } else if key.contains("view") {
            out.total_views = n;
        } else if key.contains("artist") {
            out.total_artists = n;
        }
    }
    out
}

fn first_selected_int(doc: &Html, selector: &Selector) -> Option<u64> {
    doc.select(selector)
        .find_map(|el| leading_int(&el.text().collect::<String>()))
}

fn leading_int(text: &str) -> Option<u64> {
    RE_LEADING_INT
        .captures(text)
        .and_then(|c| c[1].replace(',', "").parse().ok())
}

fn first_match(re: &Regex, text: &str) -> Option<u64> {
    re.captures(text)
        .and_then(|c| c[1].replace(',', "").parse().ok())
}
