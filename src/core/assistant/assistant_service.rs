use std::sync::Arc;

use dashmap::DashSet;

use super::ai_service::{AiProvider, AiService};
use super::assistant_models::AiError;
use super::prompt::extract_prompt;
use crate::core::settings::{SettingsService, SettingsStore};

/// Answers questions in the channels a guild has switched the assistant on for.
///
/// The enabled channels live in guild settings. A copy is kept in memory so the
/// message handler can reject most messages without taking the settings lock.
pub struct AssistantService<S: SettingsStore> {
    settings: Arc<SettingsService<S>>,
    ai: AiService<Box<dyn AiProvider>>,
    trigger: String,
    channels: DashSet<u64>,
}

impl<S: SettingsStore> AssistantService<S> {
    pub async fn new(
        settings: Arc<SettingsService<S>>,
        ai: AiService<Box<dyn AiProvider>>,
        trigger: String,
    ) -> Self {
        let channels = DashSet::new();
        for (_, guild) in settings.guilds().await {
            for channel_id in guild.assistant.enabled_channels {
                channels.insert(channel_id);
            }
        }
        tracing::debug!(channels = channels.len(), "assistant channel cache warmed");

        Self {
            settings,
            ai,
            trigger,
            channels,
        }
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn is_enabled(&self, channel_id: u64) -> bool {
        self.channels.contains(&channel_id)
    }

    /// Returns false when the channel was already enabled.
    pub async fn enable(&self, guild_id: u64, channel_id: u64) -> Result<bool, AiError> {
        let added = self
            .settings
            .update_guild(guild_id, |guild| guild.assistant.enabled_channels.insert(channel_id))
            .await?;
        self.channels.insert(channel_id);
        if added {
            tracing::info!(guild_id, channel_id, "assistant enabled");
        }
        Ok(added)
    }

    /// Returns false when the channel was not enabled.
    pub async fn disable(&self, guild_id: u64, channel_id: u64) -> Result<bool, AiError> {
        let removed = self
            .settings
            .update_guild(guild_id, |guild| guild.assistant.enabled_channels.remove(&channel_id))
            .await?;
        self.channels.remove(&channel_id);
        if removed {
            tracing::info!(guild_id, channel_id, "assistant disabled");
        }
        Ok(removed)
    }

    pub async fn channels(&self, guild_id: u64) -> Vec<u64> {
        self.settings
            .guild(guild_id)
            .await
            .assistant
            .enabled_channels
            .into_iter()
            .collect()
    }

    /// The prompt for a message in `channel_id`, if the assistant should answer it.
    pub fn prompt_for(&self, channel_id: u64, content: &str, bot_id: u64) -> Option<String> {
        if !self.is_enabled(channel_id) {
            return None;
        }
        extract_prompt(content, bot_id, &self.trigger)
    }

    pub async fn ask(&self, prompt: &str) -> Result<String, AiError> {
        self.ai.ask(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assistant::ai_service::fake::EchoProvider;
    use crate::core::assistant::AiConfig;
    use crate::core::settings::settings_service::memory::{service, MemoryStore};

    fn ai() -> AiService<Box<dyn AiProvider>> {
        AiService::new(
            Box::new(EchoProvider::default()),
            "system".into(),
            AiConfig::new("m"),
        )
    }

    async fn assistant() -> (AssistantService<MemoryStore>, Arc<SettingsService<MemoryStore>>) {
        let settings = Arc::new(service().await);
        let assistant = AssistantService::new(Arc::clone(&settings), ai(), "assistant".into()).await;
        (assistant, settings)
    }

    #[tokio::test]
    async fn enabling_updates_cache_and_settings() {
        let (assistant, settings) = assistant().await;

        assert!(assistant.enable(1, 10).await.unwrap());
        assert!(!assistant.enable(1, 10).await.unwrap());
        assert!(assistant.is_enabled(10));
        assert!(settings.guild(1).await.assistant.enabled_channels.contains(&10));

        assert!(assistant.disable(1, 10).await.unwrap());
        assert!(!assistant.disable(1, 10).await.unwrap());
        assert!(!assistant.is_enabled(10));
        assert!(assistant.channels(1).await.is_empty());
    }

    #[tokio::test]
    async fn cache_is_warmed_from_settings() {
        let settings = Arc::new(service().await);
        settings
            .update_guild(3, |guild| {
                guild.assistant.enabled_channels.insert(30);
                guild.assistant.enabled_channels.insert(31);
            })
            .await
            .unwrap();

        let assistant = AssistantService::new(settings, ai(), "assistant".into()).await;

        assert!(assistant.is_enabled(30));
        assert!(assistant.is_enabled(31));
        assert!(!assistant.is_enabled(32));
    }

    #[tokio::test]
    async fn only_enabled_channels_produce_prompts() {
        let (assistant, _) = assistant().await;
        assistant.enable(1, 10).await.unwrap();

        assert_eq!(
            assistant.prompt_for(10, "assistant what's new?", 99).as_deref(),
            Some("what's new?")
        );
        assert_eq!(assistant.prompt_for(11, "assistant what's new?", 99), None);

        assert_eq!(assistant.ask("ping").await.unwrap(), "echo: ping");
    }
}
