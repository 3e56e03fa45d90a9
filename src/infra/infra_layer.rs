// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "media/jellyfin_client.rs"]
pub mod media;

#[path = "metadata/tmdb_client.rs"]
pub mod metadata;

#[path = "netwatch/mod.rs"]
pub mod netwatch;

#[path = "settings/json_store.rs"]
pub mod settings;

#[path = "translation/google_translate_client.rs"]
pub mod translation;
