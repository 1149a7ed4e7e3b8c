//! Seams to the external collaborators of a session.
//!
//! The session never talks to a transport directly. It consumes an
//! [`ImageBackend`] for generation and edits, and an [`UploadDecoder`] to
//! turn user files into [`ImageAsset`]s. Both are object-safe so they can
//! be swapped for fakes in tests.

use async_trait::async_trait;

use crate::assets::AssetBag;
use crate::error::CoreError;
use crate::image_asset::ImageAsset;

/// Failure of a generate or edit call, carrying a human-readable cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("{0}")]
    Generation(String),

    #[error("{0}")]
    Edit(String),
}

impl BackendError {
    /// The underlying cause without any prefix.
    pub fn cause(&self) -> &str {
        match self {
            BackendError::Generation(cause) | BackendError::Edit(cause) => cause,
        }
    }
}

/// Failure to read an uploaded file into an image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

/// The external image-generation service.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Create a new model image from reference assets and a prompt.
    async fn generate(&self, assets: &AssetBag, prompt: &str) -> Result<ImageAsset, BackendError>;

    /// Apply `prompt` and optional reference images to `base`.
    async fn edit(
        &self,
        base: &ImageAsset,
        prompt: &str,
        references: &AssetBag,
    ) -> Result<ImageAsset, BackendError>;
}

/// A file handed over by the view layer, not yet validated.
#[derive(Debug, Clone, Default)]
pub struct RawUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl RawUpload {
    pub fn new(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        Self { file_name, bytes }
    }
}

/// Turns uploaded files into displayable images.
#[async_trait]
pub trait UploadDecoder: Send + Sync {
    async fn decode(&self, upload: RawUpload) -> Result<ImageAsset, DecodeError>;
}

/// Default decoder: sniffs the image format from the file header and
/// base64-encodes the bytes into a `data:` URI on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingDecoder;

#[async_trait]
impl UploadDecoder for SniffingDecoder {
    async fn decode(&self, upload: RawUpload) -> Result<ImageAsset, DecodeError> {
        let file_name = upload.file_name.clone().unwrap_or_default();
        let result = tokio::task::spawn_blocking(move || ImageAsset::from_bytes(&upload.bytes))
            .await
            .map_err(|e| DecodeError(format!("decode task failed: {e}")))?;

        result.map_err(|e| {
            tracing::debug!(file_name = %file_name, error = %e, "Upload rejected");
            match e {
                CoreError::Decode(msg) | CoreError::Validation(msg) => DecodeError(msg),
            }
        })
    }
}
