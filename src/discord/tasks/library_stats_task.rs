use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use poise::serenity_prelude as serenity;

use super::post_embed;
use crate::core::media::{LibraryStatsService, StatsTarget};
use crate::core::scheduler::{ScheduledTask, TaskError, TaskSchedule};
use crate::discord::commands::Store;
use crate::discord::embeds::library_stats_embed;

/// Keeps one stats message per guild up to date.
pub struct LibraryStatsTask {
    service: Arc<LibraryStatsService<Store>>,
    http: Arc<serenity::Http>,
}

impl LibraryStatsTask {
    pub fn new(service: Arc<LibraryStatsService<Store>>, http: Arc<serenity::Http>) -> Self {
        Self { service, http }
    }
}

/// Edit the stored message, or post a fresh one if it is gone.
pub async fn publish(
    service: &LibraryStatsService<Store>,
    http: &serenity::Http,
    target: StatsTarget,
) -> Result<(), TaskError> {
    let counts = service.library_counts(target.guild_id).await?;
    let now = Utc::now();
    let embed = library_stats_embed(&counts, now);
    let channel = serenity::ChannelId::new(target.channel_id);

    if let Some(message_id) = target.message_id {
        let edit = serenity::EditMessage::new().embed(embed.clone());
        match channel.edit_message(http, serenity::MessageId::new(message_id), edit).await {
            Ok(_) => {
                service.record_message(target.guild_id, message_id, now).await?;
                return Ok(());
            }
            Err(err) => {
                tracing::info!(guild_id = target.guild_id, error = %err, "stats message missing, posting a new one");
            }
        }
    }

    let message = post_embed(http, target.channel_id, embed).await?;
    service
        .record_message(target.guild_id, message.id.get(), now)
        .await?;
    Ok(())
}

#[async_trait]
impl ScheduledTask for LibraryStatsTask {
    fn name(&self) -> &'static str {
        "library_stats"
    }

    async fn schedule(&self) -> TaskSchedule {
        TaskSchedule::every(Duration::from_secs(24 * 60 * 60))
    }

    async fn run(&self) -> Result<(), TaskError> {
        for target in self.service.targets().await {
            if let Err(err) = publish(&self.service, &self.http, target).await {
                tracing::warn!(guild_id = target.guild_id, error = %err, "library stats update failed");
            }
        }
        Ok(())
    }
}
