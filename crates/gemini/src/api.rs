//! REST client for the Gemini image model.
//!
//! Wraps `POST {api_url}/models/{model}:generateContent` using [`reqwest`]
//! and implements [`ImageBackend`] so a session can drive it directly.

use std::time::Duration;

use async_trait::async_trait;
use vmodel_core::assets::AssetBag;
use vmodel_core::backend::{BackendError, ImageBackend};
use vmodel_core::image_asset::ImageAsset;

use crate::messages::{GenerateContentRequest, GenerateContentResponse, Part, ResponseImage};
use crate::prompt;

/// Default public endpoint.
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default image-capable model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Connection settings for [`GeminiApi`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL without a trailing slash.
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Per-request timeout. Image generation routinely takes tens of seconds.
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// HTTP client for one Gemini endpoint and model.
pub struct GeminiApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

/// Errors from the Gemini REST layer.
#[derive(Debug, thiserror::Error)]
pub enum GeminiApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Gemini returned a non-2xx status code.
    #[error("Gemini API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The call succeeded but produced no image.
    #[error("The model did not return an image: {0}")]
    NoImage(String),

    /// The returned image could not be turned into an [`ImageAsset`].
    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),
}

impl GeminiApi {
    /// Build a client with its own connection pool and timeout.
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    ///
    /// The timeout in `config` is ignored; the given client's settings apply.
    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            model: config.model,
        }
    }

    /// Full `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        let model = self.model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{}/{}:generateContent", self.api_url, model_path)
    }

    /// Generate a new model image from reference assets and a description.
    pub async fn generate_model(
        &self,
        assets: &AssetBag,
        description: &str,
    ) -> Result<ImageAsset, GeminiApiError> {
        tracing::info!(
            model = %self.model,
            references = assets.len(),
            "Requesting model generation",
        );
        self.generate_image(prompt::generation_parts(assets, description))
            .await
    }

    /// Edit `base` according to `instruction` and optional references.
    pub async fn edit_image(
        &self,
        base: &ImageAsset,
        instruction: &str,
        references: &AssetBag,
    ) -> Result<ImageAsset, GeminiApiError> {
        tracing::info!(
            model = %self.model,
            references = references.len(),
            "Requesting image edit",
        );
        self.generate_image(prompt::edit_parts(base, instruction, references))
            .await
    }

    // ---- private helpers ----

    async fn generate_image(&self, parts: Vec<Part>) -> Result<ImageAsset, GeminiApiError> {
        let body = GenerateContentRequest::image_request(parts);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: GenerateContentResponse = Self::parse_response(response).await?;
        image_from_response(&parsed)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`GeminiApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GeminiApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), "Gemini request failed");
            return Err(GeminiApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GeminiApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Convert a parsed response into an [`ImageAsset`].
pub fn image_from_response(
    response: &GenerateContentResponse,
) -> Result<ImageAsset, GeminiApiError> {
    match response.first_image() {
        ResponseImage::Image(inline) => ImageAsset::from_base64(&inline.mime_type, &inline.data)
            .map_err(|e| GeminiApiError::InvalidPayload(e.to_string())),
        ResponseImage::Missing(reason) => Err(GeminiApiError::NoImage(reason)),
    }
}

#[async_trait]
impl ImageBackend for GeminiApi {
    async fn generate(&self, assets: &AssetBag, prompt: &str) -> Result<ImageAsset, BackendError> {
        self.generate_model(assets, prompt)
            .await
            .map_err(|e| BackendError::Generation(e.to_string()))
    }

    async fn edit(
        &self,
        base: &ImageAsset,
        prompt: &str,
        references: &AssetBag,
    ) -> Result<ImageAsset, BackendError> {
        self.edit_image(base, prompt, references)
            .await
            .map_err(|e| BackendError::Edit(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn api(api_url: &str, model: &str) -> GeminiApi {
        let config = GeminiConfig {
            api_url: api_url.to_string(),
            model: model.to_string(),
            ..GeminiConfig::new("test-key")
        };
        GeminiApi::with_client(reqwest::Client::new(), config)
    }

    #[test]
    fn endpoint_prefixes_model_path() {
        let api = api("https://example.test/v1beta/", "image-model");
        assert_eq!(
            api.endpoint(),
            "https://example.test/v1beta/models/image-model:generateContent"
        );
    }

    #[test]
    fn endpoint_keeps_explicit_models_prefix() {
        let api = api("https://example.test/v1beta", "models/image-model");
        assert_eq!(
            api.endpoint(),
            "https://example.test/v1beta/models/image-model:generateContent"
        );
    }

    #[test]
    fn default_config_targets_public_endpoint() {
        let config = GeminiConfig::new("k");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn response_image_becomes_asset() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "QUJD"}}
            ]}}]
        }))
        .unwrap();

        let asset = image_from_response(&response).unwrap();
        assert_eq!(asset.as_str(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn non_image_payload_is_rejected() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "text/plain", "data": "QUJD"}}
            ]}}]
        }))
        .unwrap();

        assert_matches!(
            image_from_response(&response),
            Err(GeminiApiError::InvalidPayload(_))
        );
    }

    #[test]
    fn missing_image_maps_to_no_image_error() {
        let err = image_from_response(&GenerateContentResponse::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The model did not return an image: no image returned"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_maps_to_generation_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let api = api("http://127.0.0.1:9", "image-model");
        let err = ImageBackend::generate(&api, &AssetBag::new(), "studio photo")
            .await
            .unwrap_err();
        assert_matches!(err, BackendError::Generation(ref msg) if msg.starts_with("HTTP request failed"));
    }
}
