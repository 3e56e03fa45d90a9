use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::enrichment::{describe, ItemCard};
use super::media_models::{check_interval, validate_interval, MediaError};
use super::media_server::MediaConnector;
use crate::core::metadata::MetadataProvider;
use crate::core::settings::{NewContentSettings, SettingsService, SettingsStore};

/// Result of one new-content check.
#[derive(Debug, Clone)]
pub enum NewContentCheck {
    /// First run: the starting point was recorded, nothing is announced.
    Baseline,
    Announcements(Vec<ItemCard>),
}

pub fn is_due(settings: &NewContentSettings, now: DateTime<Utc>) -> bool {
    match settings.last_check {
        None => true,
        Some(last) => now - last >= check_interval(settings.check_interval_hours),
    }
}

/// Announces movies and series added to the media server since the last run.
pub struct NewContentService<S: SettingsStore> {
    settings: Arc<SettingsService<S>>,
    connector: Arc<dyn MediaConnector>,
    metadata: Arc<dyn MetadataProvider>,
}

impl<S: SettingsStore> NewContentService<S> {
    pub fn new(
        settings: Arc<SettingsService<S>>,
        connector: Arc<dyn MediaConnector>,
        metadata: Arc<dyn MetadataProvider>,
    ) -> Self {
        Self {
            settings,
            connector,
            metadata,
        }
    }

    pub async fn settings(&self, guild_id: u64) -> NewContentSettings {
        self.settings.guild(guild_id).await.new_content
    }

    pub async fn set_channel(&self, guild_id: u64, channel_id: u64) -> Result<(), MediaError> {
        self.settings
            .update_guild(guild_id, |guild| guild.new_content.channel_id = Some(channel_id))
            .await?;
        Ok(())
    }

    pub async fn set_interval(&self, guild_id: u64, hours: u64) -> Result<(), MediaError> {
        let hours = validate_interval(hours)?;
        self.settings
            .update_guild(guild_id, |guild| guild.new_content.check_interval_hours = hours)
            .await?;
        Ok(())
    }

    /// Forget the last check so the next run starts a fresh baseline.
    pub async fn reset(&self, guild_id: u64) -> Result<(), MediaError> {
        self.settings
            .update_guild(guild_id, |guild| guild.new_content.last_check = None)
            .await?;
        Ok(())
    }

    /// `(guild, channel)` pairs whose interval has elapsed.
    pub async fn due_guilds(&self, now: DateTime<Utc>) -> Vec<(u64, u64)> {
        self.settings
            .guilds()
            .await
            .into_iter()
            .filter(|(_, guild)| guild.media.is_configured())
            .filter(|(_, guild)| is_due(&guild.new_content, now))
            .filter_map(|(id, guild)| guild.new_content.channel_id.map(|ch| (id, ch)))
            .collect()
    }

    pub async fn check_new_content(
        &self,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<NewContentCheck, MediaError> {
        let guild = self.settings.guild(guild_id).await;
        let server = self.connector.connect(&guild.media)?;

        let Some(since) = guild.new_content.last_check else {
            self.settings
                .update_guild(guild_id, |guild| guild.new_content.last_check = Some(now))
                .await?;
            tracing::info!(guild_id, "new content baseline recorded");
            return Ok(NewContentCheck::Baseline);
        };

        let mut items: Vec<_> = server
            .items_added_since(since)
            .await?
            .into_iter()
            .filter(|item| item.date_created.is_some_and(|created| created > since))
            .collect();
        // Oldest first so the channel reads chronologically.
        items.sort_by_key(|item| item.date_created);

        let mut cards = Vec::with_capacity(items.len());
        for item in items {
            cards.push(
                describe(
                    self.metadata.as_ref(),
                    guild.metadata.tmdb_api_key.as_deref(),
                    server.base_url(),
                    item,
                )
                .await,
            );
        }

        self.settings
            .update_guild(guild_id, |guild| guild.new_content.last_check = Some(now))
            .await?;

        tracing::info!(guild_id, found = cards.len(), "new content check finished");
        Ok(NewContentCheck::Announcements(cards))
    }
}
