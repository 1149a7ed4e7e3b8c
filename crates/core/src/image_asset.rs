//! Encoded image payloads carried through the session as `data:` URIs.
//!
//! [`ImageAsset`] is the single currency exchanged between uploads, the
//! image backend and the history store. It is validated once at
//! construction and treated as an immutable value afterwards.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Extension used when the MIME type has no better mapping.
pub const FALLBACK_EXTENSION: &str = "png";

/// An immutable encoded image, stored as `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageAsset(String);

impl ImageAsset {
    /// Parse and validate a `data:` URI.
    ///
    /// The URI must carry an `image/*` MIME type, the `;base64` marker and a
    /// non-empty payload.
    pub fn from_data_uri(uri: impl Into<String>) -> Result<Self, CoreError> {
        let uri = uri.into();
        split_data_uri(&uri)?;
        Ok(Self(uri))
    }

    /// Build an asset from an already base64-encoded payload.
    pub fn from_base64(mime_type: &str, payload: &str) -> Result<Self, CoreError> {
        Self::from_data_uri(format!("data:{mime_type};base64,{payload}"))
    }

    /// Encode raw file bytes, sniffing the MIME type from the header.
    ///
    /// Fails with [`CoreError::Decode`] for empty input or an unrecognised
    /// image format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::Decode("file is empty".to_string()));
        }
        let format = image::guess_format(bytes)
            .map_err(|e| CoreError::Decode(format!("unrecognised image format: {e}")))?;
        let mime_type = format.to_mime_type();
        Ok(Self(format!("data:{mime_type};base64,{}", BASE64.encode(bytes))))
    }

    /// The full `data:` URI.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MIME type from the URI header, e.g. `image/png`.
    pub fn mime_type(&self) -> &str {
        // Validated at construction.
        split_data_uri(&self.0).map(|(mime, _)| mime).unwrap_or_default()
    }

    /// Base64 payload without the `data:` header.
    pub fn base64_payload(&self) -> &str {
        split_data_uri(&self.0)
            .map(|(_, payload)| payload)
            .unwrap_or_default()
    }

    /// Decode the payload back into raw bytes.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, CoreError> {
        BASE64
            .decode(self.base64_payload())
            .map_err(|e| CoreError::Decode(format!("invalid base64 payload: {e}")))
    }

    /// File extension matching the MIME type, falling back to `png`.
    pub fn file_extension(&self) -> &'static str {
        match self.mime_type() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => FALLBACK_EXTENSION,
        }
    }
}

impl TryFrom<String> for ImageAsset {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_uri(value)
    }
}

impl From<ImageAsset> for String {
    fn from(asset: ImageAsset) -> Self {
        asset.0
    }
}

/// Split a `data:` URI into `(mime_type, payload)`.
fn split_data_uri(uri: &str) -> Result<(&str, &str), CoreError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CoreError::Validation("image must be a data: URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CoreError::Validation("data: URI has no payload".to_string()))?;
    let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
        CoreError::Validation("data: URI must be base64 encoded".to_string())
    })?;
    if !mime_type.starts_with("image/") {
        return Err(CoreError::Validation(format!(
            "unsupported MIME type '{mime_type}', expected image/*"
        )));
    }
    if payload.is_empty() {
        return Err(CoreError::Validation("data: URI payload is empty".to_string()));
    }
    Ok((mime_type, payload))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    /// Smallest valid PNG signature followed by an IHDR chunk header.
    const PNG_HEADER: &[u8] = &[
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
        b'R',
    ];

    #[test]
    fn parses_valid_data_uri() {
        let asset = ImageAsset::from_data_uri("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(asset.mime_type(), "image/jpeg");
        assert_eq!(asset.base64_payload(), "AAAA");
        assert_eq!(asset.file_extension(), "jpg");
    }

    #[test]
    fn rejects_non_data_uri() {
        assert_matches!(
            ImageAsset::from_data_uri("https://example.com/a.png"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn rejects_non_image_mime() {
        let err = ImageAsset::from_data_uri("data:text/plain;base64,AAAA").unwrap_err();
        assert!(err.to_string().contains("text/plain"));
    }

    #[test]
    fn rejects_missing_base64_marker_and_empty_payload() {
        assert!(ImageAsset::from_data_uri("data:image/png,AAAA").is_err());
        assert!(ImageAsset::from_data_uri("data:image/png;base64,").is_err());
    }

    #[test]
    fn sniffs_png_from_bytes() {
        let asset = ImageAsset::from_bytes(PNG_HEADER).unwrap();
        assert_eq!(asset.mime_type(), "image/png");
        assert!(asset.as_str().starts_with("data:image/png;base64,"));
        assert_eq!(asset.decode_bytes().unwrap(), PNG_HEADER);
    }

    #[test]
    fn empty_and_unknown_bytes_fail_to_decode() {
        assert_matches!(ImageAsset::from_bytes(&[]), Err(CoreError::Decode(_)));
        assert_matches!(
            ImageAsset::from_bytes(b"definitely not an image"),
            Err(CoreError::Decode(_))
        );
    }

    #[test]
    fn unknown_mime_falls_back_to_png_extension() {
        let asset = ImageAsset::from_data_uri("data:image/avif;base64,AAAA").unwrap();
        assert_eq!(asset.file_extension(), FALLBACK_EXTENSION);
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<ImageAsset, _> =
            serde_json::from_str("\"data:image/png;base64,AAAA\"");
        assert!(ok.is_ok());
        let bad: Result<ImageAsset, _> = serde_json::from_str("\"not-a-uri\"");
        assert!(bad.is_err());
    }
}
