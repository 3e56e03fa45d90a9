// Discord layer - commands, embeds, background tasks and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "embeds/media_embeds.rs"]
pub mod embeds;

#[path = "tasks/mod.rs"]
pub mod tasks;

#[path = "assistant/message_handler.rs"]
pub mod assistant;

// Re-export command types for convenience
pub use commands::{Context, Data, Error};
