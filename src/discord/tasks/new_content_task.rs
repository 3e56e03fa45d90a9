use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use poise::serenity_prelude as serenity;

use super::post_embed;
use crate::core::media::{NewContentCheck, NewContentService};
use crate::core::scheduler::{ScheduledTask, TaskError, TaskSchedule};
use crate::discord::commands::Store;
use crate::discord::embeds::new_content_embed;

pub struct NewContentTask {
    service: Arc<NewContentService<Store>>,
    http: Arc<serenity::Http>,
}

impl NewContentTask {
    pub fn new(service: Arc<NewContentService<Store>>, http: Arc<serenity::Http>) -> Self {
        Self { service, http }
    }
}

/// Check one guild and post whatever is new. Returns how many items were posted.
pub async fn announce(
    service: &NewContentService<Store>,
    http: &serenity::Http,
    guild_id: u64,
    channel_id: u64,
) -> Result<usize, TaskError> {
    let cards = match service.check_new_content(guild_id, Utc::now()).await? {
        NewContentCheck::Baseline => return Ok(0),
        NewContentCheck::Announcements(cards) => cards,
    };

    let mut posted = 0;
    for card in &cards {
        match post_embed(http, channel_id, new_content_embed(card)).await {
            Ok(_) => posted += 1,
            Err(err) => {
                tracing::warn!(guild_id, item = %card.item.name, error = %err, "failed to announce item");
            }
        }
    }
    Ok(posted)
}

#[async_trait]
impl ScheduledTask for NewContentTask {
    fn name(&self) -> &'static str {
        "new_content"
    }

    async fn schedule(&self) -> TaskSchedule {
        TaskSchedule::every_with_jitter(Duration::from_secs(60 * 60), Duration::from_secs(5 * 60))
    }

    async fn run(&self) -> Result<(), TaskError> {
        for (guild_id, channel_id) in self.service.due_guilds(Utc::now()).await {
            match announce(&self.service, &self.http, guild_id, channel_id).await {
                Ok(posted) => tracing::debug!(guild_id, posted, "new content checked"),
                Err(err) => tracing::warn!(guild_id, error = %err, "new content check failed"),
            }
        }
        Ok(())
    }
}
