//! Image ingestion pipeline
//!
//! Turns inline image payloads into stored files:
//!
//! 1. [`decode`](decode::decode): data URL / base64 → bytes + declared mime
//! 2. [`classify`](classify::classify): bytes → verified [`TypedImage`](classify::TypedImage)
//! 3. [`FileStore::save`](storage::FileStore::save): bytes → stored URL
//!
//! [`policy`] decides which submitted images enter the pipeline at all.
//! Orchestration lives in the page store.
//!
//! # Example
//!
//! ```no_run
//! use couchsport_shared::images::{classify::classify, decode::decode};
//! use couchsport_shared::images::storage::{FileStore, LocalFileStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = LocalFileStore::new("./uploads", "/uploads").await?;
//!
//! let typed = classify(decode("data:image/gif;base64,R0lGODlhAQABAAAAACw=")?)?;
//! let url = store.save("page-1", Some("pixel.gif"), &typed).await?;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod decode;
pub mod policy;
pub mod storage;

/// Error type for image ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The payload is not a valid data URL / base64 string
    #[error("Invalid image encoding: {0}")]
    InvalidEncoding(String),

    /// The bytes are not an accepted image format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The image entry cannot be stored as submitted
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Writing to external storage failed
    #[error("Image storage error: {0}")]
    Storage(#[from] std::io::Error),
}
