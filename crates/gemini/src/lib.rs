//! Gemini image-generation client.
//!
//! Provides typed `generateContent` messages, the prompt/part layout for
//! model generation and edits, and [`api::GeminiApi`], which implements the
//! session's image backend over HTTP.

pub mod api;
pub mod messages;
pub mod prompt;

pub use api::{GeminiApi, GeminiApiError, GeminiConfig};
