use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;

use super::post_embed;
use crate::core::netwatch::PortMonitorService;
use crate::core::scheduler::{ScheduledTask, TaskError, TaskSchedule};
use crate::discord::commands::Store;
use crate::discord::embeds::port_transition_embed;

pub struct PortMonitorTask {
    service: Arc<PortMonitorService<Store>>,
    http: Arc<serenity::Http>,
}

impl PortMonitorTask {
    pub fn new(service: Arc<PortMonitorService<Store>>, http: Arc<serenity::Http>) -> Self {
        Self { service, http }
    }
}

#[async_trait]
impl ScheduledTask for PortMonitorTask {
    fn name(&self) -> &'static str {
        "port_monitor"
    }

    async fn schedule(&self) -> TaskSchedule {
        TaskSchedule::every(Duration::from_secs(60 * 60))
    }

    async fn run(&self) -> Result<(), TaskError> {
        for transition in self.service.sweep().await? {
            let channel_id = transition.monitor.channel_id;
            if let Err(err) = post_embed(&self.http, channel_id, port_transition_embed(&transition)).await {
                tracing::warn!(
                    guild_id = transition.guild_id,
                    channel_id,
                    error = %err,
                    "failed to post port change"
                );
            }
        }
        Ok(())
    }
}
