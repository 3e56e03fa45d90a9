// Background jobs. Each one is a `ScheduledTask`: it decides when it runs and
// turns core results into Discord messages. The loop itself lives in core.

pub mod inactivity_task;
pub mod ip_monitor_task;
pub mod library_stats_task;
pub mod new_content_task;
pub mod port_monitor_task;
pub mod recommendation_task;

use std::sync::Arc;

use poise::serenity_prelude as serenity;

use crate::discord::Data;

pub use inactivity_task::InactivityTask;
pub use ip_monitor_task::IpMonitorTask;
pub use library_stats_task::LibraryStatsTask;
pub use new_content_task::NewContentTask;
pub use port_monitor_task::PortMonitorTask;
pub use recommendation_task::RecommendationTask;

/// Register every background job with the scheduler.
pub fn spawn_all(data: &Data, http: Arc<serenity::Http>) {
    let scheduler = &data.scheduler;
    scheduler.spawn(InactivityTask::new(Arc::clone(&data.inactivity), Arc::clone(&http)));
    scheduler.spawn(NewContentTask::new(Arc::clone(&data.new_content), Arc::clone(&http)));
    scheduler.spawn(RecommendationTask::new(Arc::clone(&data.catalog), Arc::clone(&http)));
    scheduler.spawn(LibraryStatsTask::new(Arc::clone(&data.library_stats), Arc::clone(&http)));
    scheduler.spawn(IpMonitorTask::new(Arc::clone(&data.ip_watch), Arc::clone(&http)));
    scheduler.spawn(PortMonitorTask::new(Arc::clone(&data.ports), http));
}

/// Post one embed to a channel.
pub async fn post_embed(
    http: &serenity::Http,
    channel_id: u64,
    embed: serenity::CreateEmbed,
) -> Result<serenity::Message, serenity::Error> {
    serenity::ChannelId::new(channel_id)
        .send_message(http, serenity::CreateMessage::new().embed(embed))
        .await
}
