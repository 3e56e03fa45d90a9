use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::media_models::{LibraryCount, MediaError};
use super::media_server::MediaConnector;
use crate::core::settings::{SettingsService, SettingsStore};

/// Where a guild's stats message lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsTarget {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: Option<u64>,
}

pub struct LibraryStatsService<S: SettingsStore> {
    settings: Arc<SettingsService<S>>,
    connector: Arc<dyn MediaConnector>,
}

impl<S: SettingsStore> LibraryStatsService<S> {
    pub fn new(settings: Arc<SettingsService<S>>, connector: Arc<dyn MediaConnector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    /// Item counts per library, in server order.
    pub async fn library_counts(&self, guild_id: u64) -> Result<Vec<LibraryCount>, MediaError> {
        let guild = self.settings.guild(guild_id).await;
        let server = self.connector.connect(&guild.media)?;

        let folders = server.media_folders().await?;
        let mut counts = Vec::with_capacity(folders.len());
        for folder in folders {
            let count = server.item_count(&folder.id).await?;
            counts.push(LibraryCount {
                name: folder.name,
                count,
            });
        }
        Ok(counts)
    }

    /// Point the stats message at a new channel. The old message is forgotten.
    pub async fn set_channel(&self, guild_id: u64, channel_id: u64) -> Result<(), MediaError> {
        self.settings
            .update_guild(guild_id, |guild| {
                guild.library_stats.channel_id = Some(channel_id);
                guild.library_stats.message_id = None;
            })
            .await?;
        Ok(())
    }

    pub async fn disable(&self, guild_id: u64) -> Result<(), MediaError> {
        self.settings
            .update_guild(guild_id, |guild| {
                guild.library_stats.channel_id = None;
                guild.library_stats.message_id = None;
            })
            .await?;
        Ok(())
    }

    /// Remember which message was posted (or edited) and when.
    pub async fn record_message(
        &self,
        guild_id: u64,
        message_id: u64,
        at: DateTime<Utc>,
    ) -> Result<(), MediaError> {
        self.settings
            .update_guild(guild_id, |guild| {
                guild.library_stats.message_id = Some(message_id);
                guild.library_stats.last_update = Some(at);
            })
            .await?;
        Ok(())
    }

    pub async fn target(&self, guild_id: u64) -> Option<StatsTarget> {
        let guild = self.settings.guild(guild_id).await;
        guild.library_stats.channel_id.map(|channel_id| StatsTarget {
            guild_id,
            channel_id,
            message_id: guild.library_stats.message_id,
        })
    }

    pub async fn targets(&self) -> Vec<StatsTarget> {
        self.settings
            .guilds()
            .await
            .into_iter()
            .filter(|(_, guild)| guild.media.is_configured())
            .filter_map(|(guild_id, guild)| {
                guild.library_stats.channel_id.map(|channel_id| StatsTarget {
                    guild_id,
                    channel_id,
                    message_id: guild.library_stats.message_id,
                })
            })
            .collect()
    }
}
