use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use poise::serenity_prelude as serenity;

use super::post_embed;
use crate::core::media::InactivityService;
use crate::core::scheduler::{ScheduledTask, TaskError, TaskSchedule};
use crate::discord::commands::Store;
use crate::discord::embeds::inactivity_report_embed;

const WAKE_INTERVAL: Duration = Duration::from_secs(60 * 60);
const WAKE_JITTER: Duration = Duration::from_secs(5 * 60);

/// Wakes hourly and sweeps every guild whose own check interval has elapsed.
pub struct InactivityTask {
    service: Arc<InactivityService<Store>>,
    http: Arc<serenity::Http>,
}

impl InactivityTask {
    pub fn new(service: Arc<InactivityService<Store>>, http: Arc<serenity::Http>) -> Self {
        Self { service, http }
    }
}

#[async_trait]
impl ScheduledTask for InactivityTask {
    fn name(&self) -> &'static str {
        "inactivity_sweep"
    }

    async fn schedule(&self) -> TaskSchedule {
        TaskSchedule::every_with_jitter(WAKE_INTERVAL, WAKE_JITTER)
    }

    async fn run(&self) -> Result<(), TaskError> {
        let now = Utc::now();
        for (guild_id, channel_id) in self.service.due_guilds(now).await {
            let report = match self.service.sweep(guild_id, now).await {
                Ok(report) => report,
                Err(err) => {
                    tracing::warn!(guild_id, error = %err, "inactivity sweep failed");
                    continue;
                }
            };

            if report.is_empty() {
                tracing::debug!(guild_id, "no inactive users");
                continue;
            }

            if let Err(err) = post_embed(&self.http, channel_id, inactivity_report_embed(&report)).await {
                tracing::warn!(guild_id, channel_id, error = %err, "failed to post inactivity report");
            }
        }
        Ok(())
    }
}
