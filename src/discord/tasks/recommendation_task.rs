use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveTime, Weekday};
use poise::serenity_prelude as serenity;

use super::post_embed;
use crate::core::media::CatalogService;
use crate::core::scheduler::{ScheduledTask, TaskError, TaskSchedule};
use crate::discord::commands::Store;
use crate::discord::embeds::recommendation_embed;

/// Monday evening pick for every guild that opted in.
pub struct RecommendationTask {
    catalog: Arc<CatalogService<Store>>,
    http: Arc<serenity::Http>,
}

impl RecommendationTask {
    pub fn new(catalog: Arc<CatalogService<Store>>, http: Arc<serenity::Http>) -> Self {
        Self { catalog, http }
    }
}

#[async_trait]
impl ScheduledTask for RecommendationTask {
    fn name(&self) -> &'static str {
        "weekly_recommendation"
    }

    async fn schedule(&self) -> TaskSchedule {
        TaskSchedule::WeeklyAt {
            weekday: Weekday::Mon,
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        }
    }

    async fn run(&self) -> Result<(), TaskError> {
        for (guild_id, channel_id) in self.catalog.weekly_targets().await {
            match self.catalog.recommend(guild_id).await {
                Ok(Some(recommendation)) => {
                    if let Err(err) =
                        post_embed(&self.http, channel_id, recommendation_embed(&recommendation)).await
                    {
                        tracing::warn!(guild_id, channel_id, error = %err, "failed to post recommendation");
                    }
                }
                Ok(None) => tracing::info!(guild_id, "library is empty, nothing to recommend"),
                Err(err) => tracing::warn!(guild_id, error = %err, "recommendation failed"),
            }
        }
        Ok(())
    }
}
