// Chat assistant.
// - `assistant_models.rs`: messages, config, errors.
// - `ai_service.rs`: provider port and system-prompt handling.
// - `prompt.rs`: trigger detection and reply chunking.
// - `assistant_service.rs`: per-guild channel switches.

pub mod ai_service;
pub mod assistant_models;
pub mod assistant_service;
pub mod prompt;

pub use ai_service::{AiProvider, AiService};
pub use assistant_models::{AiConfig, AiError, AiMessage, AiProviderResponse};
pub use assistant_service::AssistantService;
pub use prompt::{extract_prompt, split_message, DISCORD_MESSAGE_LIMIT};
