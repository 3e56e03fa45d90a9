use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::assistant::{AiConfig, AiError, AiMessage, AiProvider, AiProviderResponse};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: Client,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AiError::Http(e.to_string()))?;
        Ok(Self { client, api_key })
    }

    // The Messages API takes the system prompt as a top-level field.
    fn build_request<'a>(messages: &'a [AiMessage], config: &'a AiConfig) -> MessagesRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();

        MessagesRequest {
            model: &config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != "system")
                .map(|m| ApiMessage {
                    role: if m.role == "assistant" { "assistant" } else { "user" },
                    content: &m.content,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl AiProvider for AnthropicClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        let payload = Self::build_request(messages, config);

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(AiError::Status { status, message });
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AiError::Decode(e.to_string()))?;

        Ok(AiProviderResponse {
            content: body.text(),
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

impl MessagesResponse {
    fn text(self) -> String {
        self.content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect()
    }
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_is_lifted_out() {
        let messages = vec![
            AiMessage::system("be concise"),
            AiMessage::user("hi"),
            AiMessage {
                role: "assistant".into(),
                content: "hello".into(),
            },
        ];
        let config = AiConfig::new("claude-sonnet");
        let json = serde_json::to_value(AnthropicClient::build_request(&messages, &config)).unwrap();

        assert_eq!(json["system"], "be concise");
        assert_eq!(json["max_tokens"], 800);
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(json["messages"][1]["role"], "assistant");
    }

    #[test]
    fn only_text_blocks_are_kept() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Hello"},{"type":"tool_use","id":"x"},{"type":"text","text":" there"}]}"#,
        )
        .unwrap();
        assert_eq!(body.text(), "Hello there");
    }
}
