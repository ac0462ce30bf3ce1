// src/extract/content.rs
//! Content extraction from the depot page: images, videos, GIFs.
//!
//! Every pass de-duplicates by source URL and is capped, so a hostile or
//! restructured page can never balloon the payload. Ids are derived from
//! the URL (hash-like path segments, then a digest fallback) so repeated
//! extractions of the same content keep the same id.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use url::Url;

use crate::types::{ContentItem, ContentKind};

/// CDN host/path markers for depot-hosted stills.
const IMAGE_CDN_MARKERS: [&str; 3] = ["imagedelivery.net", "cdn.memedepot.com", "/uploads/"];
/// Streaming-thumbnail host marker for embedded videos.
const VIDEO_THUMB_MARKER: &str = "cloudflarestream.com";
/// URLs carrying these markers are site chrome, not community content.
const EXCLUDED_URL_MARKERS: [&str; 3] = ["avatar", "logo", "icon"];

static SEL_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("static selector"));
static SEL_VIDEO_POSTER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("video[poster]").expect("static selector"));

// Id patterns in decreasing specificity: UUID, long hex run, slug before an
// image extension.
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})")
            .expect("static regex"),
        Regex::new(r"/([0-9a-fA-F]{16,64})(?:[/.?#]|$)").expect("static regex"),
        Regex::new(r"/([A-Za-z0-9_-]{8,})\.(?:jpe?g|png|webp|gif)").expect("static regex"),
    ]
});

// Cloudflare-Images-style sizing variants: a trailing `/w=NNN[,...]` path
// segment, or explicit width/height query params.
static RE_SIZE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?:w|width|h|height)=\d+[^/?#]*$").expect("static regex"));

const STANDARD_VARIANT: &str = "/w=600";

/// Derive a stable id for a content URL. Pure function of the URL: the
/// first matching hash-like segment, else a hex digest prefix. Never fails.
pub fn derive_content_id(url: &str) -> String {
    for re in ID_PATTERNS.iter() {
        if let Some(c) = re.captures(url) {
            let segment = &c[1];
            // A slug without a single digit ("thumbnail", "preview") is a
            // filename, not a hash; those collide across items.
            if !segment.chars().any(|ch| ch.is_ascii_digit()) {
                continue;
            }
            return segment.to_ascii_lowercase();
        }
    }
    let digest = Sha256::digest(url.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Rewrite sizing hints to one standard thumbnail size so equal content
/// always yields equal URLs (and therefore equal ids).
pub fn normalize_thumbnail_url(raw: &str) -> String {
    let replaced = RE_SIZE_SEGMENT.replace(raw, STANDARD_VARIANT);
    let Ok(mut parsed) = Url::parse(&replaced) else {
        return replaced.into_owned();
    };
    if parsed.query().is_some() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(k, _)| !matches!(k.as_ref(), "width" | "height" | "w" | "h"))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        parsed.set_query(None);
        if !kept.is_empty() {
            let mut q = parsed.query_pairs_mut();
            for (k, v) in &kept {
                q.append_pair(k, v);
            }
        }
    }
    parsed.to_string()
}

pub fn extract_images(doc: &Html, max: usize) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for el in doc.select(&SEL_IMG) {
        if out.len() >= max {
            break;
        }
        let Some(src) = element_src(&el) else { continue };
        if !is_depot_image(&src) || is_excluded(&src) || src.ends_with(".gif") {
            continue;
        }
        let url = normalize_thumbnail_url(&src);
        if !seen.insert(url.clone()) {
            continue;
        }
        out.push(ContentItem {
            id: derive_content_id(&url),
            title: alt_or(&el, "Community meme"),
            description: "From the KEVIN community depot".to_string(),
            category: "Meme".to_string(),
            image_url: url,
            kind: ContentKind::Image,
        });
    }
    out
}

pub fn extract_videos(doc: &Html, max: usize) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let poster_urls = doc
        .select(&SEL_VIDEO_POSTER)
        .filter_map(|el| el.attr("poster").map(str::to_string));
    let img_urls = doc.select(&SEL_IMG).filter_map(|el| element_src(&el));

    for src in poster_urls.chain(img_urls) {
        if out.len() >= max {
            break;
        }
        if !src.contains(VIDEO_THUMB_MARKER) || is_excluded(&src) {
            continue;
        }
        if !seen.insert(src.clone()) {
            continue;
        }
        let video_id = derive_video_id(&src);
        out.push(ContentItem {
            id: derive_content_id(&src),
            title: "Community video".to_string(),
            description: "From the KEVIN community depot".to_string(),
            category: "Video".to_string(),
            image_url: src,
            kind: ContentKind::Video {
                video_url: video_id,
            },
        });
    }
    out
}

pub fn extract_gifs(doc: &Html, max: usize) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for el in doc.select(&SEL_IMG) {
        if out.len() >= max {
            break;
        }
        let Some(src) = element_src(&el) else { continue };
        let path_only = src.split(['?', '#']).next().unwrap_or(&src);
        if !path_only.to_ascii_lowercase().ends_with(".gif") || is_excluded(&src) {
            continue;
        }
        if !seen.insert(src.clone()) {
            continue;
        }
        out.push(ContentItem {
            id: derive_content_id(&src),
            title: alt_or(&el, "Community GIF"),
            description: "From the KEVIN community depot".to_string(),
            category: "GIF".to_string(),
            image_url: src,
            kind: ContentKind::Gif,
        });
    }
    out
}

/// The embed id is the path segment right before `/thumbnails`, falling
/// back to the last non-empty segment.
fn derive_video_id(src: &str) -> String {
    if let Ok(parsed) = Url::parse(src) {
        if let Some(segments) = parsed.path_segments() {
            let segs: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
            if let Some(pos) = segs.iter().position(|s| *s == "thumbnails") {
                if pos > 0 {
                    return segs[pos - 1].to_string();
                }
            }
            if let Some(last) = segs.last() {
                return last.to_string();
            }
        }
    }
    derive_content_id(src)
}

fn element_src(el: &ElementRef) -> Option<String> {
    el.attr("src")
        .or_else(|| el.attr("data-src"))
        .map(str::to_string)
}

fn alt_or(el: &ElementRef, default: &str) -> String {
    match el.attr("alt").map(str::trim) {
        Some(alt) if !alt.is_empty() => super::clean_text(alt),
        _ => default.to_string(),
    }
}

fn is_depot_image(src: &str) -> bool {
    IMAGE_CDN_MARKERS.iter().any(|m| src.contains(m))
}

fn is_excluded(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    EXCLUDED_URL_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_derivation_is_stable_and_total() {
        let uuid_url = "https://imagedelivery.net/acct/01234567-89ab-cdef-0123-456789abcdef/w=200";
        assert_eq!(
            derive_content_id(uuid_url),
            "01234567-89ab-cdef-0123-456789abcdef"
        );
        assert_eq!(derive_content_id(uuid_url), derive_content_id(uuid_url));

        let hex_url = "https://cdn.memedepot.com/0123456789abcdef0123/full.png";
        assert_eq!(derive_content_id(hex_url), "0123456789abcdef0123");

        let slug_url = "https://cdn.memedepot.com/uploads/kevin_rocket_42.png";
        assert_eq!(derive_content_id(slug_url), "kevin_rocket_42");

        // Digit-free slugs are filenames, not hashes; they get the digest.
        let wordy = "https://cdn.memedepot.com/uploads/thumbnail.png";
        assert_eq!(derive_content_id(wordy).len(), 16);

        // No recognizable segment: digest fallback, 16 hex chars, stable.
        let odd = "not a url at all";
        let id = derive_content_id(odd);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, derive_content_id(odd));
    }

    #[test]
    fn thumbnail_sizes_normalize_to_one_variant() {
        assert_eq!(
            normalize_thumbnail_url("https://imagedelivery.net/a/b/w=200"),
            "https://imagedelivery.net/a/b/w=600"
        );
        assert_eq!(
            normalize_thumbnail_url("https://imagedelivery.net/a/b/w=128,h=128"),
            "https://imagedelivery.net/a/b/w=600"
        );
        assert_eq!(
            normalize_thumbnail_url("https://cdn.memedepot.com/uploads/x.png?width=100&height=50&v=2"),
            "https://cdn.memedepot.com/uploads/x.png?v=2"
        );
    }

    #[test]
    fn image_pass_filters_chrome_and_dedups() {
        let html = r#"
            <img src="https://cdn.memedepot.com/uploads/one.png">
            <img src="https://cdn.memedepot.com/uploads/one.png">
            <img src="https://cdn.memedepot.com/uploads/site-logo.png">
            <img src="https://cdn.memedepot.com/avatars/avatar-7.png">
            <img src="https://elsewhere.example.com/two.png">
        "#;
        let doc = Html::parse_document(html);
        let items = extract_images(&doc, 10);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].image_url, "https://cdn.memedepot.com/uploads/one.png");
    }

    #[test]
    fn image_pass_respects_cap() {
        let html: String = (0..20)
            .map(|i| format!("<img src=\"https://cdn.memedepot.com/uploads/m{i:02}.png\">"))
            .collect();
        let doc = Html::parse_document(&html);
        assert_eq!(extract_images(&doc, 10).len(), 10);
    }

    #[test]
    fn video_and_gif_passes_respect_caps() {
        let videos: String = (0..9)
            .map(|i| {
                format!(
                    "<img src=\"https://customer-x.cloudflarestream.com/vid{i}/thumbnails/thumbnail.jpg\">"
                )
            })
            .collect();
        let gifs: String = (0..9)
            .map(|i| format!("<img src=\"https://cdn.memedepot.com/uploads/loop{i}.gif\">"))
            .collect();
        let doc = Html::parse_document(&format!("{videos}{gifs}"));
        assert_eq!(extract_videos(&doc, 5).len(), 5);
        assert_eq!(extract_gifs(&doc, 3).len(), 3);
    }

    #[test]
    fn video_id_prefers_segment_before_thumbnails() {
        let html = r#"
            <img src="https://customer-abc.cloudflarestream.com/vid123/thumbnails/thumbnail.jpg">
            <video poster="https://customer-abc.cloudflarestream.com/vid456/frame.jpg"></video>
        "#;
        let doc = Html::parse_document(html);
        let items = extract_videos(&doc, 5);
        assert_eq!(items.len(), 2);
        let ids: Vec<&str> = items
            .iter()
            .map(|i| match &i.kind {
                ContentKind::Video { video_url } => video_url.as_str(),
                _ => panic!("expected video"),
            })
            .collect();
        assert!(ids.contains(&"vid123"));
        // No /thumbnails marker: last path segment.
        assert!(ids.contains(&"frame.jpg"));
    }

    #[test]
    fn gif_pass_keeps_only_gif_suffix() {
        let html = r#"
            <img src="https://cdn.memedepot.com/uploads/dance.gif">
            <img src="https://cdn.memedepot.com/uploads/still.png">
            <img src="https://elsewhere.example.com/loop.GIF?x=1">
        "#;
        let doc = Html::parse_document(html);
        let items = extract_gifs(&doc, 3);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| matches!(i.kind, ContentKind::Gif)));
    }
}
