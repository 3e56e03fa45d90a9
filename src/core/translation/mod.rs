use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Http(String),
    #[error("translation service returned HTTP {0}")]
    Status(u16),
    #[error("unexpected translation response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_lang` (ISO code such as `ro` or `de`).
    /// Blank input comes back unchanged.
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError>;
}
