use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;

use crate::core::netwatch::{
    deliver_first, notification_text, notify_targets, IpCheck, IpNotifyTarget, IpWatchService,
};
use crate::core::scheduler::{ScheduledTask, TaskError, TaskSchedule};
use crate::discord::commands::Store;
use crate::discord::embeds::ip_change_message;

/// Daily public-IP check at the configured local time.
pub struct IpMonitorTask {
    service: Arc<IpWatchService<Store>>,
    http: Arc<serenity::Http>,
}

impl IpMonitorTask {
    pub fn new(service: Arc<IpWatchService<Store>>, http: Arc<serenity::Http>) -> Self {
        Self { service, http }
    }
}

/// Send `text` wherever IP notifications are configured to go.
pub async fn deliver(http: &serenity::Http, target: IpNotifyTarget, text: &str) -> Result<(), serenity::Error> {
    match target {
        IpNotifyTarget::Channel(channel_id) => {
            serenity::ChannelId::new(channel_id).say(http, text).await?;
        }
        IpNotifyTarget::User(user_id) => {
            serenity::UserId::new(user_id)
                .direct_message(http, serenity::CreateMessage::new().content(text))
                .await?;
        }
    }
    Ok(())
}

/// Send `body` to the first configured target that accepts it: the channel
/// (pinging the configured user), then a DM. `None` means nobody is configured.
pub async fn notify(
    service: &IpWatchService<Store>,
    http: &serenity::Http,
    body: &str,
) -> Result<Option<IpNotifyTarget>, serenity::Error> {
    let settings = service.status().await;
    let mention = settings.notify_user_id;
    deliver_first(&notify_targets(&settings), |target| {
        let text = notification_text(target, mention, body);
        async move { deliver(http, target, &text).await }
    })
    .await
}

/// Check the address and announce a change. The new address is only stored
/// once the announcement went out, so a failed delivery is retried next time.
pub async fn check_and_notify(
    service: &IpWatchService<Store>,
    http: &serenity::Http,
) -> Result<IpCheck, TaskError> {
    let check = service.check().await?;

    if let IpCheck::Changed { old, new } = &check {
        match notify(service, http, &ip_change_message(old, new)).await? {
            Some(target) => {
                tracing::info!(?target, "IP change delivered");
                service.commit(new).await?;
            }
            None => tracing::warn!("public IP changed but nobody is configured to hear about it"),
        }
    }
    Ok(check)
}

#[async_trait]
impl ScheduledTask for IpMonitorTask {
    fn name(&self) -> &'static str {
        "ip_monitor"
    }

    async fn schedule(&self) -> TaskSchedule {
        TaskSchedule::DailyAt {
            time: self.service.check_time().await,
        }
    }

    async fn run(&self) -> Result<(), TaskError> {
        if !self.service.status().await.enabled {
            tracing::debug!("IP monitor disabled, skipping");
            return Ok(());
        }
        let check = check_and_notify(&self.service, &self.http).await?;
        tracing::info!(?check, "public IP checked");
        Ok(())
    }
}
