// The core module contains all business logic.
// Each feature gets its own submodule; none of them know about Discord.

#[path = "assistant/mod.rs"]
pub mod assistant;

#[path = "media/mod.rs"]
pub mod media;

#[path = "metadata/mod.rs"]
pub mod metadata;

#[path = "netwatch/mod.rs"]
pub mod netwatch;

#[path = "scheduler/mod.rs"]
pub mod scheduler;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "translation/mod.rs"]
pub mod translation;
