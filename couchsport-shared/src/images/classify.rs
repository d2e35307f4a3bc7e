//! Image format detection
//!
//! The declared mime type of an upload is never trusted on its own: the
//! bytes must start with the signature of an accepted format, and a declared
//! type that disagrees with the signature is rejected.

use super::decode::DecodedImage;
use super::IngestError;

/// Accepted image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Detects the format from the leading bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

        if bytes.starts_with(PNG) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(JPEG) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// File extension used for stored files
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }

    /// Whether a declared mime type names this format
    fn accepts_mime(&self, mime: &str) -> bool {
        mime == self.mime_type() || (*self == ImageFormat::Jpeg && mime == "image/jpg")
    }
}

/// Bytes verified to be an image of a known format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Validates that decoded bytes are an accepted image
///
/// # Errors
///
/// Returns `IngestError::UnsupportedFormat` if the signature is unknown or
/// contradicts the declared mime type.
///
/// # Example
///
/// ```
/// use couchsport_shared::images::classify::{classify, ImageFormat};
/// use couchsport_shared::images::decode::DecodedImage;
///
/// let decoded = DecodedImage {
///     mime_type: Some("image/gif".to_string()),
///     bytes: b"GIF89a...".to_vec(),
/// };
/// assert_eq!(classify(decoded).unwrap().format, ImageFormat::Gif);
/// ```
pub fn classify(decoded: DecodedImage) -> Result<TypedImage, IngestError> {
    let format = ImageFormat::sniff(&decoded.bytes).ok_or_else(|| {
        IngestError::UnsupportedFormat(
            decoded
                .mime_type
                .clone()
                .unwrap_or_else(|| "unknown signature".to_string()),
        )
    })?;

    if let Some(declared) = &decoded.mime_type {
        if !format.accepts_mime(declared) {
            return Err(IngestError::UnsupportedFormat(format!(
                "declared {} but content is {}",
                declared,
                format.mime_type()
            )));
        }
    }

    Ok(TypedImage {
        format,
        bytes: decoded.bytes,
    })
}
