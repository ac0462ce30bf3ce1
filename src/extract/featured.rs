// src/extract/featured.rs
//! Featured-list assembly: videos lead, images follow rotated by a time
//! bucket, GIFs close. The rotation surfaces different items every bucket
//! without any server-side pagination; within one bucket the ordering is
//! stable so repeated fetches do not churn the UI.

use crate::types::ContentItem;

/// One rotation bucket: five minutes.
pub const ROTATION_BUCKET_MS: u64 = 5 * 60 * 1000;

/// Cosmetic title pool, applied round-robin with a 1-based position.
pub const FLAVOR_TITLES: [&str; 4] = [
    "🔴 LATEST KEVIN",
    "🆕 FRESH UPLOAD",
    "🔥 COMMUNITY PICK",
    "⭐ DEPOT FAVORITE",
];

pub fn assemble_featured(
    videos: Vec<ContentItem>,
    images: Vec<ContentItem>,
    gifs: Vec<ContentItem>,
    now_ms: u64,
) -> Vec<ContentItem> {
    let mut out = videos;
    out.extend(rotate_by_bucket(images, now_ms));
    out.extend(gifs);
    for (index, item) in out.iter_mut().enumerate() {
        item.title = format!(
            "{} #{}",
            FLAVOR_TITLES[index % FLAVOR_TITLES.len()],
            index + 1
        );
    }
    out
}

fn rotate_by_bucket(mut images: Vec<ContentItem>, now_ms: u64) -> Vec<ContentItem> {
    if images.is_empty() {
        return images;
    }
    let bucket = (now_ms / ROTATION_BUCKET_MS) as usize;
    let offset = bucket % images.len();
    images.rotate_left(offset);
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentKind;

    fn item(id: &str, kind: ContentKind) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: String::new(),
            description: String::new(),
            category: String::new(),
            image_url: format!("https://cdn.memedepot.com/uploads/{id}.png"),
            kind,
        }
    }

    #[test]
    fn videos_lead_then_images_then_gifs() {
        let featured = assemble_featured(
            vec![item("v1", ContentKind::Video { video_url: "v1".into() })],
            vec![item("i1", ContentKind::Image)],
            vec![item("g1", ContentKind::Gif)],
            0,
        );
        let ids: Vec<&str> = featured.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "i1", "g1"]);
    }

    #[test]
    fn titles_cycle_round_robin_with_position() {
        let images = (0..6).map(|i| item(&format!("i{i}"), ContentKind::Image)).collect();
        let featured = assemble_featured(Vec::new(), images, Vec::new(), 0);
        assert_eq!(featured[0].title, format!("{} #1", FLAVOR_TITLES[0]));
        assert_eq!(featured[3].title, format!("{} #4", FLAVOR_TITLES[3]));
        assert_eq!(featured[4].title, format!("{} #5", FLAVOR_TITLES[0]));
    }

    #[test]
    fn same_bucket_same_order_next_bucket_rotates() {
        let images: Vec<ContentItem> =
            (0..3).map(|i| item(&format!("i{i}"), ContentKind::Image)).collect();

        let in_bucket_a = assemble_featured(Vec::new(), images.clone(), Vec::new(), 10_000);
        let in_bucket_a2 = assemble_featured(Vec::new(), images.clone(), Vec::new(), 20_000);
        assert_eq!(in_bucket_a, in_bucket_a2);

        let in_bucket_b =
            assemble_featured(Vec::new(), images, Vec::new(), 10_000 + ROTATION_BUCKET_MS);
        let ids_a: Vec<&str> = in_bucket_a.iter().map(|i| i.id.as_str()).collect();
        let ids_b: Vec<&str> = in_bucket_b.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids_a, vec!["i0", "i1", "i2"]);
        assert_eq!(ids_b, vec!["i1", "i2", "i0"]);
    }
}
