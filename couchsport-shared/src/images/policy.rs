//! Submission policies applied before ingestion
//!
//! Kept apart from the pipeline so the skip and cap rules can be verified on
//! their own.

use uuid::Uuid;

use crate::models::image::ImagePayload;

/// Maximum number of images ingested from one submission
pub const MAX_IMAGES_PER_SUBMISSION: usize = 6;

/// Selects the images a submission may ingest
///
/// Structurally invalid entries are dropped wherever they appear, then the
/// first [`MAX_IMAGES_PER_SUBMISSION`] remaining entries are kept in
/// submission order. Everything else is silently ignored.
///
/// # Example
///
/// ```
/// use couchsport_shared::images::policy::{admit_images, MAX_IMAGES_PER_SUBMISSION};
/// use couchsport_shared::models::image::ImagePayload;
///
/// let submitted: Vec<ImagePayload> = (0..8)
///     .map(|i| ImagePayload { url: format!("/uploads/{}.png", i), ..Default::default() })
///     .collect();
///
/// let admitted = admit_images(submitted);
/// assert_eq!(admitted.len(), MAX_IMAGES_PER_SUBMISSION);
/// assert_eq!(admitted[0].url, "/uploads/0.png");
/// ```
pub fn admit_images(images: Vec<ImagePayload>) -> Vec<ImagePayload> {
    images
        .into_iter()
        .filter(ImagePayload::is_valid)
        .take(MAX_IMAGES_PER_SUBMISSION)
        .collect()
}

/// Storage directory for the images of a page owner
pub fn page_directory(owner_profile_id: Uuid) -> String {
    format!("page-{}", owner_profile_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(url: &str) -> ImagePayload {
        ImagePayload {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_admit_caps_at_six_in_order() {
        let submitted: Vec<ImagePayload> = (0..8).map(|i| stored(&format!("/u/{}", i))).collect();

        let urls: Vec<String> = admit_images(submitted).into_iter().map(|i| i.url).collect();

        assert_eq!(urls, vec!["/u/0", "/u/1", "/u/2", "/u/3", "/u/4", "/u/5"]);
    }

    #[test]
    fn test_admit_drops_invalid_regardless_of_position() {
        let submitted = vec![
            ImagePayload::default(),
            stored("/u/a"),
            ImagePayload::default(),
            stored("/u/b"),
        ];

        let urls: Vec<String> = admit_images(submitted).into_iter().map(|i| i.url).collect();

        assert_eq!(urls, vec!["/u/a", "/u/b"]);
    }

    #[test]
    fn test_invalid_entries_do_not_consume_the_cap() {
        let mut submitted = vec![ImagePayload::default(); 3];
        submitted.extend((0..6).map(|i| stored(&format!("/u/{}", i))));

        assert_eq!(admit_images(submitted).len(), 6);
    }

    #[test]
    fn test_page_directory() {
        let id = Uuid::nil();
        assert_eq!(page_directory(id), "page-00000000-0000-0000-0000-000000000000");
    }
}
