// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// Implements `AiProvider` against Google's `generateContent` endpoint
// (https://ai.google.dev/api/generate-content).
//
// - Authentication: the API key goes in the `?key=` query parameter.
// - Request format: `contents[]` with nested `parts`; the system prompt is a
//   separate top-level `systemInstruction` rather than a message.
// - Response format: text lives at `candidates[0].content.parts[*].text`.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - API key from https://aistudio.google.com/apikey

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::assistant::{AiConfig, AiError, AiMessage, AiProvider, AiProviderResponse};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================

/// A single part of content. Only text parts are used here.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// One turn of the conversation. Gemini calls the assistant role `model`.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    #[serde(skip_serializing_if = "String::is_empty")]
    role: String,
    parts: Vec<Part>,
}

/// Sampling parameters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    /// Creates a new Gemini client with the given API key.
    pub fn new(api_key: String) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AiError::Http(e.to_string()))?;
        Ok(Self { client, api_key })
    }

    /// Converts an `AiMessage` to Gemini's `Content`.
    ///
    /// - "assistant" becomes "model"
    /// - anything else is sent as "user"
    fn convert_message(msg: &AiMessage) -> Content {
        let role = match msg.role.as_str() {
            "assistant" => "model",
            _ => "user",
        };
        Content {
            role: role.to_string(),
            parts: vec![Part {
                text: Some(msg.content.clone()),
            }],
        }
    }

    /// Builds the request body. All system messages are merged into
    /// `systemInstruction`.
    fn build_request(messages: &[AiMessage], config: &AiConfig) -> GenerateContentRequest {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .filter(|c| !c.trim().is_empty())
            .collect();

        let system_instruction = (!system.is_empty()).then(|| Content {
            role: String::new(),
            parts: vec![Part {
                text: Some(system.join("\n\n")),
            }],
        });

        GenerateContentRequest {
            contents: messages
                .iter()
                .filter(|m| m.role != "system")
                .map(Self::convert_message)
                .collect(),
            system_instruction,
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
            },
        }
    }

    /// Joins the text parts of the first candidate.
    fn extract_text(response: GenerateContentResponse) -> Result<String, AiError> {
        let candidate = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| {
                AiError::Decode(
                    "No content in Gemini response - the model may have been blocked by safety filters"
                        .to_string(),
                )
            })?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            tracing::warn!(finish_reason = ?candidate.finish_reason, "Gemini returned no text");
        }
        Ok(text)
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, config.model);
        let request = Self::build_request(messages, config);

        // Never log the key.
        tracing::debug!(model = %config.model, messages = messages.len(), "Gemini request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(AiError::Status { status, message });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AiError::Decode(e.to_string()))?;

        Ok(AiProviderResponse {
            content: Self::extract_text(body)?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
