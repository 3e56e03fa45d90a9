use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::core::translation::{TranslateError, Translator};

const TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Google's keyless web-client endpoint. Source language is auto-detected.
pub struct GoogleTranslateClient {
    client: Client,
}

impl GoogleTranslateClient {
    pub fn new() -> Result<Self, TranslateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| TranslateError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Translator for GoogleTranslateClient {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let response = self
            .client
            .get(TRANSLATE_URL)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| TranslateError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslateError::Status(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslateError::Decode(e.to_string()))?;
        parse_translation(&body)
    }
}

/// The answer is `[[["translated", "source", ...], ...], ...]`, one entry per sentence.
fn parse_translation(body: &Value) -> Result<String, TranslateError> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Decode("missing sentence list".to_string()))?;

    let translated: String = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::Decode("no translated text".to_string()));
    }
    Ok(translated)
}
