// Typed bot settings.
// - `settings_models.rs` defines the persisted document and its defaults.
// - `settings_service.rs` owns the live copy and the store port.

pub mod settings_models;
pub mod settings_service;

pub use settings_models::*;
pub use settings_service::{SettingsError, SettingsService, SettingsStore};
