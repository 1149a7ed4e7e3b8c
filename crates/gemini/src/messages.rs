//! Gemini `generateContent` request and response types.
//!
//! Only the fields needed for image generation are modelled. Responses are
//! accepted in both the camelCase form the REST API emits and the
//! snake_case form some proxies rewrite it to.

use serde::{Deserialize, Serialize};
use vmodel_core::image_asset::ImageAsset;

/// Body of a `POST /models/{model}:generateContent` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// A single-turn user request asking for image output.
    pub fn image_request(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A text or inline-image part of a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn image(asset: &ImageAsset) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: asset.mime_type().to_string(),
                data: asset.base64_payload().to_string(),
            }),
        }
    }
}

/// Base64 image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

/// Response of `generateContent`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

/// What a response yielded: the first inline image, or why there was none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseImage {
    Image(InlineData),
    Missing(String),
}

impl GenerateContentResponse {
    /// Find the first inline image across all candidates.
    ///
    /// When there is none, the explanation prefers any text the model
    /// returned, then a block reason, then a finish reason.
    pub fn first_image(&self) -> ResponseImage {
        let parts = || {
            self.candidates
                .iter()
                .filter_map(|c| c.content.as_ref())
                .flat_map(|c| c.parts.iter())
        };

        if let Some(inline) = parts().find_map(|p| p.inline_data.as_ref()) {
            return ResponseImage::Image(inline.clone());
        }

        let text: Vec<&str> = parts()
            .filter_map(|p| p.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if !text.is_empty() {
            return ResponseImage::Missing(text.join(" "));
        }

        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return ResponseImage::Missing(format!("request blocked ({reason})"));
        }

        match self.candidates.iter().find_map(|c| c.finish_reason.as_deref()) {
            Some(reason) => ResponseImage::Missing(format!("no image returned ({reason})")),
            None => ResponseImage::Missing("no image returned".to_string()),
        }
    }
}
