use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::settings::SettingsError;

pub const DEFAULT_MAX_TOKENS: u32 = 800;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant in a Discord server. Keep answers short and friendly.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: String,
    pub content: String,
}

impl AiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl AiConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Raw answer from a provider.
#[derive(Debug, Clone, Default)]
pub struct AiProviderResponse {
    pub content: String,
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Http(String),
    #[error("AI API error: {status} - {message}")]
    Status { status: u16, message: String },
    #[error("unexpected AI response: {0}")]
    Decode(String),
    #[error("the model returned an empty answer")]
    Empty,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
