use std::fmt::Display;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveTime;

use super::NetwatchError;
use crate::core::scheduler::schedule::parse_clock_time;
use crate::core::settings::{IpMonitorSettings, SettingsService, SettingsStore};

/// Where the bot's public address can be read from.
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    async fn current_ip(&self) -> Result<IpAddr, NetwatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpCheck {
    /// Nothing was stored yet; `ip` is now the reference.
    Baseline(String),
    Unchanged(String),
    /// Not committed until `commit` is called after a successful notification.
    Changed { old: String, new: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpNotifyTarget {
    Channel(u64),
    User(u64),
}

/// Delivery order: the channel when enabled, then a DM to the configured user.
pub fn notify_targets(settings: &IpMonitorSettings) -> Vec<IpNotifyTarget> {
    let channel = settings
        .channel_id
        .filter(|_| settings.use_channel)
        .map(IpNotifyTarget::Channel);
    let user = settings.notify_user_id.map(IpNotifyTarget::User);
    channel.into_iter().chain(user).collect()
}

/// Channel posts ping the configured user; DMs go out as is.
pub fn notification_text(target: IpNotifyTarget, mention: Option<u64>, body: &str) -> String {
    match (target, mention) {
        (IpNotifyTarget::Channel(_), Some(user)) => format!("<@{user}> {body}"),
        _ => body.to_string(),
    }
}

/// Try `targets` in order and stop at the first successful send.
///
/// Returns `Ok(None)` when there is nobody to notify and the last error when
/// every target failed.
pub async fn deliver_first<F, Fut, E>(
    targets: &[IpNotifyTarget],
    mut send: F,
) -> Result<Option<IpNotifyTarget>, E>
where
    F: FnMut(IpNotifyTarget) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut last_error = None;
    for &target in targets {
        match send(target).await {
            Ok(()) => return Ok(Some(target)),
            Err(err) => {
                tracing::warn!(?target, error = %err, "IP notification failed, trying next target");
                last_error = Some(err);
            }
        }
    }
    match last_error {
        Some(err) => Err(err),
        None => Ok(None),
    }
}

pub fn default_check_time() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()
}

pub struct IpWatchService<S: SettingsStore> {
    settings: Arc<SettingsService<S>>,
    source: Arc<dyn PublicIpSource>,
}

impl<S: SettingsStore> IpWatchService<S> {
    pub fn new(settings: Arc<SettingsService<S>>, source: Arc<dyn PublicIpSource>) -> Self {
        Self { settings, source }
    }

    pub async fn status(&self) -> IpMonitorSettings {
        self.settings.global().await.ip_monitor
    }

    pub async fn current_ip(&self) -> Result<String, NetwatchError> {
        Ok(self.source.current_ip().await?.to_string())
    }

    /// The configured daily check time, or noon if the stored value is bad.
    pub async fn check_time(&self) -> NaiveTime {
        parse_clock_time(&self.status().await.check_time).unwrap_or_else(default_check_time)
    }

    pub async fn check(&self) -> Result<IpCheck, NetwatchError> {
        let current = self.current_ip().await?;

        let stored = self.settings.global().await.ip_monitor.last_ip;
        match stored {
            None => {
                self.commit(&current).await?;
                tracing::info!(ip = %current, "public IP baseline stored");
                Ok(IpCheck::Baseline(current))
            }
            Some(old) if old == current => Ok(IpCheck::Unchanged(current)),
            Some(old) => {
                tracing::info!(old = %old, new = %current, "public IP changed");
                Ok(IpCheck::Changed { old, new: current })
            }
        }
    }

    pub async fn commit(&self, ip: &str) -> Result<(), NetwatchError> {
        let ip = ip.to_string();
        self.settings
            .update_global(|global| global.ip_monitor.last_ip = Some(ip))
            .await?;
        Ok(())
    }

    /// Store whatever the current address is without notifying anyone.
    pub async fn force_save(&self) -> Result<String, NetwatchError> {
        let current = self.current_ip().await?;
        self.commit(&current).await?;
        Ok(current)
    }

    pub async fn set_user(&self, user_id: u64) -> Result<(), NetwatchError> {
        self.settings
            .update_global(|global| global.ip_monitor.notify_user_id = Some(user_id))
            .await?;
        Ok(())
    }

    /// `None` switches back to direct messages.
    pub async fn set_channel(&self, channel_id: Option<u64>) -> Result<(), NetwatchError> {
        self.settings
            .update_global(|global| {
                global.ip_monitor.channel_id = channel_id;
                global.ip_monitor.use_channel = channel_id.is_some();
            })
            .await?;
        Ok(())
    }

    pub async fn set_check_time(&self, raw: &str) -> Result<NaiveTime, NetwatchError> {
        let time =
            parse_clock_time(raw).ok_or_else(|| NetwatchError::InvalidTime(raw.to_string()))?;
        let formatted = time.format("%H:%M").to_string();
        self.settings
            .update_global(|global| global.ip_monitor.check_time = formatted)
            .await?;
        Ok(time)
    }

    /// Flip monitoring on or off, returning the new state.
    pub async fn toggle(&self) -> Result<bool, NetwatchError> {
        let enabled = self
            .settings
            .update_global(|global| {
                global.ip_monitor.enabled = !global.ip_monitor.enabled;
                global.ip_monitor.enabled
            })
            .await?;
        Ok(enabled)
    }
}
