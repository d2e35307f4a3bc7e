//! External storage for ingested images
//!
//! [`FileStore`] is the seam between ingestion and wherever image bytes end
//! up. [`LocalFileStore`] writes them under a root directory, one
//! sub-directory per page owner, and returns the public URL the HTTP layer
//! serves them from.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use super::classify::TypedImage;
use super::IngestError;

/// Longest stem kept from the client-suggested file name
const MAX_STEM_LENGTH: usize = 40;

/// Persists image bytes and returns a stable reference
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `image` under `directory`
    ///
    /// The stored name is collision-resistant; `suggested_name` only
    /// contributes a readable stem.
    ///
    /// # Errors
    ///
    /// - `IngestError::Storage` on I/O failure
    /// - `IngestError::InvalidImage` if `directory` is not a plain name
    async fn save(
        &self,
        directory: &str,
        suggested_name: Option<&str>,
        image: &TypedImage,
    ) -> Result<String, IngestError>;
}

/// [`FileStore`] writing to the local filesystem
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalFileStore {
    /// Creates the store, creating `root` if needed
    pub async fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Result<Self, IngestError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!("Image storage directory: {}", root.display());

        Ok(Self {
            root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Path on disk of a URL returned by [`FileStore::save`]
    #[cfg(test)]
    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(&self.url_prefix)?.trim_start_matches('/');
        let mut parts = relative.split('/');
        let (dir, file) = (parts.next()?, parts.next()?);

        if parts.next().is_some() || !is_plain_name(dir) || !is_plain_name(file) {
            return None;
        }
        Some(self.root.join(dir).join(file))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(
        &self,
        directory: &str,
        suggested_name: Option<&str>,
        image: &TypedImage,
    ) -> Result<String, IngestError> {
        if !is_plain_name(directory) {
            return Err(IngestError::InvalidImage(format!(
                "invalid storage directory '{}'",
                directory
            )));
        }

        let dir = self.root.join(directory);
        fs::create_dir_all(&dir).await?;

        let filename = stored_filename(suggested_name, image.format.extension());
        let path = dir.join(&filename);

        // create_new refuses to overwrite an existing file
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&image.bytes).await?;
        file.flush().await?;

        debug!(path = %path.display(), bytes = image.bytes.len(), "Stored image");
        Ok(format!("{}/{}/{}", self.url_prefix, directory, filename))
    }
}

/// `{uuid}-{stem}.{ext}`, or `{uuid}.{ext}` without a usable stem
pub fn stored_filename(suggested_name: Option<&str>, extension: &str) -> String {
    let id = Uuid::new_v4().simple();

    let stem = suggested_name.map(sanitize_stem).unwrap_or_default();
    if stem.is_empty() {
        format!("{}.{}", id, extension)
    } else {
        format!("{}-{}.{}", id, stem, extension)
    }
}

/// Keeps ASCII alphanumerics, `-` and `_` of the name without its extension
fn sanitize_stem(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };

    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .chars()
        .take(MAX_STEM_LENGTH)
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::classify::ImageFormat;

    fn png() -> TypedImage {
        TypedImage {
            format: ImageFormat::Png,
            bytes: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0],
        }
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("Beach Day.PNG"), "beach-day");
        assert_eq!(sanitize_stem("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_stem("C:\\photos\\spot_1.jpeg"), "spot_1");
        assert_eq!(sanitize_stem(".hidden"), "hidden");
        assert_eq!(sanitize_stem("***.png"), "");
    }

    #[test]
    fn test_stored_filename_is_unique() {
        let a = stored_filename(Some("spot.png"), "png");
        let b = stored_filename(Some("spot.png"), "png");

        assert_ne!(a, b);
        assert!(a.ends_with("-spot.png"));
        assert!(stored_filename(None, "gif").ends_with(".gif"));
    }

    #[test]
    fn test_is_plain_name() {
        assert!(is_plain_name("page-42"));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("a/b"));
        assert!(!is_plain_name(""));
    }

    #[tokio::test]
    async fn test_save_writes_under_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new(tmp.path(), "/uploads/").await.expect("store");

        let url = store.save("page-1", Some("wave.png"), &png()).await.expect("save");

        assert!(url.starts_with("/uploads/page-1/"));
        assert!(url.ends_with("-wave.png"));

        let path = store.path_for_url(&url).expect("path for url");
        let written = tokio::fs::read(&path).await.expect("read back");
        assert_eq!(written, png().bytes);
    }

    #[tokio::test]
    async fn test_save_rejects_traversal_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new(tmp.path(), "/uploads").await.expect("store");

        let result = store.save("../outside", None, &png()).await;
        assert!(matches!(result, Err(IngestError::InvalidImage(_))));
    }

    #[test]
    fn test_path_for_url_rejects_foreign_urls() {
        let store = LocalFileStore {
            root: PathBuf::from("/srv/uploads"),
            url_prefix: "/uploads".to_string(),
        };

        assert_eq!(
            store.path_for_url("/uploads/page-1/a.png"),
            Some(PathBuf::from("/srv/uploads/page-1/a.png"))
        );
        assert!(store.path_for_url("/static/page-1/a.png").is_none());
        assert!(store.path_for_url("/uploads/../a.png").is_none());
        assert!(store.path_for_url("/uploads/page-1/x/a.png").is_none());
    }
}
