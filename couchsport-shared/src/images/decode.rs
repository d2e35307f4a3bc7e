//! Inline image payload decoding
//!
//! Clients submit images either as a data URL
//! (`data:image/png;base64,iVBORw0...`) or as a bare base64 string. Both
//! decode to raw bytes plus the declared mime type, if any. Whitespace and
//! line breaks inside the payload are ignored.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::IngestError;

/// Decoded payload, not yet checked against an image format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Mime type declared by the data URL, lowercased
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Decodes a data URL or bare base64 string
///
/// # Errors
///
/// Returns `IngestError::InvalidEncoding` if the data URL header is
/// malformed, the payload is not base64, or it decodes to nothing.
///
/// # Example
///
/// ```
/// use couchsport_shared::images::decode::decode;
///
/// let image = decode("data:image/gif;base64,R0lGODlh").unwrap();
/// assert_eq!(image.mime_type.as_deref(), Some("image/gif"));
/// assert_eq!(image.bytes, b"GIF89a");
/// ```
pub fn decode(encoded: &str) -> Result<DecodedImage, IngestError> {
    let encoded = encoded.trim();

    let (mime_type, payload) = match encoded.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| IngestError::InvalidEncoding("data URL has no payload".to_string()))?;

            let mime = header.strip_suffix(";base64").ok_or_else(|| {
                IngestError::InvalidEncoding("data URL is not base64 encoded".to_string())
            })?;

            let mime = mime.trim().to_ascii_lowercase();
            (if mime.is_empty() { None } else { Some(mime) }, payload)
        }
        None => (None, encoded),
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| IngestError::InvalidEncoding(e.to_string()))?;

    if bytes.is_empty() {
        return Err(IngestError::InvalidEncoding("empty image payload".to_string()));
    }

    Ok(DecodedImage { mime_type, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        let image = decode("data:image/PNG;base64,aGVsbG8=").expect("decode");

        assert_eq!(image.mime_type.as_deref(), Some("image/png"));
        assert_eq!(image.bytes, b"hello");
    }

    #[test]
    fn test_decode_bare_base64_with_line_breaks() {
        let image = decode("aGVs\nbG8=\r\n").expect("decode");

        assert!(image.mime_type.is_none());
        assert_eq!(image.bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("not base64 at all!"),
            Err(IngestError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_base64_data_url() {
        assert!(matches!(
            decode("data:text/plain,hello"),
            Err(IngestError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_decode_rejects_data_url_without_comma() {
        assert!(matches!(
            decode("data:image/png;base64"),
            Err(IngestError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(matches!(
            decode("data:image/png;base64,"),
            Err(IngestError::InvalidEncoding(_))
        ));
    }
}
