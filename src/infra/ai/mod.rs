pub mod anthropic_client;
pub mod gemini_client;

pub use anthropic_client::AnthropicClient;
pub use gemini_client::GeminiClient;
