//! Canonical product image resolution.

use super::product::{ImageField, ImageRef, ProductRecord};

/// Resolve the canonical image URL of a product.
///
/// Candidates are tried in this order, each trimmed, with empty values
/// skipped:
///
/// 1. `image.large`, `image.medium`, `image.small`
/// 2. `image_url`, then `imageUrl`
/// 3. `image` as a plain string
/// 4. the first `images[]` entry (string, `src` or `url`)
/// 5. `featuredImage.url`
///
/// Returns `None` when nothing usable remains, never an empty string.
pub fn resolve_image_url(product: &ProductRecord) -> Option<String> {
    let (large, medium, small, plain) = match &product.image {
        Some(ImageField::Sized {
            large,
            medium,
            small,
        }) => (large.as_deref(), medium.as_deref(), small.as_deref(), None),
        Some(ImageField::Url(url)) => (None, None, None, Some(url.as_str())),
        Some(ImageField::Other(_)) | None => (None, None, None, None),
    };

    let first_of_images = product.images.first().and_then(|entry| match entry {
        ImageRef::Url(url) => non_empty(url),
        ImageRef::Object { src, url } => src
            .as_deref()
            .and_then(non_empty)
            .or_else(|| url.as_deref().and_then(non_empty)),
        ImageRef::Other(_) => None,
    });

    let featured = product
        .featured_image
        .as_ref()
        .and_then(|f| f.url.as_deref());

    [
        large,
        medium,
        small,
        product.image_url.as_deref(),
        product.image_url_camel.as_deref(),
        plain,
    ]
    .into_iter()
    .flatten()
    .find_map(non_empty)
    .or(first_of_images)
    .or_else(|| featured.and_then(non_empty))
}

fn non_empty(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::store::product::FeaturedImage;

    fn product(json: serde_json::Value) -> ProductRecord {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn images_src_only() {
        let p = product(serde_json::json!({"id": "a", "images": [{"src": "x.png"}]}));
        assert_eq!(resolve_image_url(&p).as_deref(), Some("x.png"));
    }

    #[test]
    fn no_image_fields_is_none() {
        let p = product(serde_json::json!({"id": "a"}));
        assert_eq!(resolve_image_url(&p), None);
    }

    #[test]
    fn blank_candidates_never_yield_empty_string() {
        let p = product(serde_json::json!({
            "id": "a",
            "image": "   ",
            "image_url": "",
            "images": [""],
            "featuredImage": {"url": " "}
        }));
        assert_eq!(resolve_image_url(&p), None);
    }

    #[test]
    fn sized_variants_win_in_order() {
        let p = product(serde_json::json!({
            "id": "a",
            "image": {"large": " ", "medium": "m.png", "small": "s.png"},
            "image_url": "flat.png"
        }));
        assert_eq!(resolve_image_url(&p).as_deref(), Some("m.png"));
    }

    #[test]
    fn flat_fields_before_plain_string_image() {
        let p = product(serde_json::json!({
            "id": "a",
            "imageUrl": "camel.png",
            "images": ["list.png"]
        }));
        assert_eq!(resolve_image_url(&p).as_deref(), Some("camel.png"));

        let p = product(serde_json::json!({"id": "a", "image": " plain.png "}));
        assert_eq!(resolve_image_url(&p).as_deref(), Some("plain.png"));
    }

    #[test]
    fn empty_first_image_falls_through_to_featured() {
        let mut p = product(serde_json::json!({"id": "a", "images": [{"src": ""}]}));
        p.featured_image = Some(FeaturedImage {
            url: Some("feat.png".into()),
        });
        assert_eq!(resolve_image_url(&p).as_deref(), Some("feat.png"));
    }

    #[test]
    fn images_url_key() {
        let p = product(serde_json::json!({"id": "a", "images": [{"url": "u.png"}, "later.png"]}));
        assert_eq!(resolve_image_url(&p).as_deref(), Some("u.png"));
    }
}
