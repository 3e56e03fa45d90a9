use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::media_models::{check_interval, validate_interval, MediaError, MediaUser};
use super::media_server::MediaConnector;
use crate::core::settings::{InactivitySettings, SettingsService, SettingsStore};

/// How long a user may stay idle before being disabled, then deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityThresholds {
    pub disable_after: Duration,
    pub delete_after: Duration,
}

impl InactivityThresholds {
    pub fn from_days(disable_after: u32, delete_after: u32) -> Result<Self, MediaError> {
        if disable_after == 0 || disable_after >= delete_after {
            return Err(MediaError::InvalidThresholds {
                disable_after,
                delete_after,
            });
        }

        Ok(Self {
            disable_after: Duration::days(i64::from(disable_after)),
            delete_after: Duration::days(i64::from(delete_after)),
        })
    }

    pub fn from_settings(settings: &InactivitySettings) -> Result<Self, MediaError> {
        Self::from_days(settings.disable_after_days, settings.delete_after_days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Active,
    Disable,
    Delete,
}

/// How long `user` counts as inactive at `now`.
///
/// Users with no recorded activity are treated as having been idle for the
/// disable threshold when we first saw them, so they age from there.
pub fn inactive_for(
    user: &MediaUser,
    now: DateTime<Utc>,
    first_seen: Option<DateTime<Utc>>,
    thresholds: &InactivityThresholds,
) -> Duration {
    match user.last_activity {
        Some(last) => (now - last).max(Duration::zero()),
        None => {
            let seen = first_seen.unwrap_or(now);
            thresholds.disable_after + (now - seen).max(Duration::zero())
        }
    }
}

pub fn classify(
    user: &MediaUser,
    now: DateTime<Utc>,
    first_seen: Option<DateTime<Utc>>,
    thresholds: &InactivityThresholds,
) -> Verdict {
    if user.is_admin {
        return Verdict::Active;
    }

    let idle = inactive_for(user, now, first_seen, thresholds);
    if idle >= thresholds.delete_after {
        Verdict::Delete
    } else if idle >= thresholds.disable_after {
        Verdict::Disable
    } else {
        Verdict::Active
    }
}

/// True when the guild has never been swept or its interval has elapsed.
pub fn is_due(settings: &InactivitySettings, now: DateTime<Utc>) -> bool {
    match settings.last_check {
        None => true,
        Some(last) => {
            now - last >= check_interval(settings.check_interval_hours)
        }
    }
}

#[derive(Debug, Clone)]
pub struct InactiveUser {
    pub id: String,
    pub name: String,
    pub last_activity: Option<DateTime<Utc>>,
    pub inactive_days: i64,
    pub already_disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Disabled,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub user: String,
    pub kind: ActionKind,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InactivityReport {
    pub to_disable: Vec<InactiveUser>,
    pub to_delete: Vec<InactiveUser>,
    pub actions: Vec<ActionOutcome>,
    pub enforced: bool,
}

impl InactivityReport {
    pub fn is_empty(&self) -> bool {
        self.to_disable.is_empty() && self.to_delete.is_empty()
    }
}

/// Snapshot of a guild's monitor configuration for status output.
#[derive(Debug, Clone)]
pub struct InactivityStatus {
    pub server_url: Option<String>,
    pub settings: InactivitySettings,
}

/// Finds idle media-server accounts and, when enforcement is on, disables or
/// deletes them.
pub struct InactivityService<S: SettingsStore> {
    settings: Arc<SettingsService<S>>,
    connector: Arc<dyn MediaConnector>,
}

impl<S: SettingsStore> InactivityService<S> {
    pub fn new(settings: Arc<SettingsService<S>>, connector: Arc<dyn MediaConnector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    pub async fn status(&self, guild_id: u64) -> InactivityStatus {
        let guild = self.settings.guild(guild_id).await;
        InactivityStatus {
            server_url: guild.media.normalized_url(),
            settings: guild.inactivity,
        }
    }

    pub async fn set_channel(&self, guild_id: u64, channel_id: u64) -> Result<(), MediaError> {
        self.settings
            .update_guild(guild_id, |guild| {
                guild.inactivity.notification_channel_id = Some(channel_id)
            })
            .await?;
        Ok(())
    }

    pub async fn set_interval(&self, guild_id: u64, hours: u64) -> Result<(), MediaError> {
        let hours = validate_interval(hours)?;
        self.settings
            .update_guild(guild_id, |guild| guild.inactivity.check_interval_hours = hours)
            .await?;
        Ok(())
    }

    pub async fn set_thresholds(
        &self,
        guild_id: u64,
        disable_after_days: u32,
        delete_after_days: u32,
    ) -> Result<(), MediaError> {
        InactivityThresholds::from_days(disable_after_days, delete_after_days)?;
        self.settings
            .update_guild(guild_id, |guild| {
                guild.inactivity.disable_after_days = disable_after_days;
                guild.inactivity.delete_after_days = delete_after_days;
            })
            .await?;
        Ok(())
    }

    pub async fn set_enforce(&self, guild_id: u64, enforce: bool) -> Result<(), MediaError> {
        self.settings
            .update_guild(guild_id, |guild| guild.inactivity.enforce = enforce)
            .await?;
        Ok(())
    }

    /// Guilds with a configured server and channel whose interval has elapsed.
    pub async fn due_guilds(&self, now: DateTime<Utc>) -> Vec<(u64, u64)> {
        self.settings
            .guilds()
            .await
            .into_iter()
            .filter(|(_, guild)| guild.media.is_configured())
            .filter(|(_, guild)| is_due(&guild.inactivity, now))
            .filter_map(|(id, guild)| {
                guild
                    .inactivity
                    .notification_channel_id
                    .map(|channel| (id, channel))
            })
            .collect()
    }

    /// Classify every user of the guild's server and, if enforcement is on,
    /// act on the verdicts.
    pub async fn sweep(
        &self,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<InactivityReport, MediaError> {
        let guild = self.settings.guild(guild_id).await;
        let server = self.connector.connect(&guild.media)?;
        let thresholds = InactivityThresholds::from_settings(&guild.inactivity)?;

        let users = server.list_users().await?;

        // Bookkeeping and classification happen under one settings update so
        // two overlapping sweeps cannot both record a first sighting.
        let (classified, enforce) = self
            .settings
            .update_guild(guild_id, |guild| {
                let records = &mut guild.inactivity.first_seen_inactive;
                let present: HashSet<&str> = users.iter().map(|u| u.id.as_str()).collect();
                records.retain(|id, _| present.contains(id.as_str()));

                let mut classified = Vec::with_capacity(users.len());
                for user in &users {
                    let first_seen = if user.last_activity.is_none() && !user.is_admin {
                        Some(*records.entry(user.id.clone()).or_insert(now))
                    } else {
                        records.remove(&user.id);
                        None
                    };

                    let verdict = classify(user, now, first_seen, &thresholds);
                    let idle = inactive_for(user, now, first_seen, &thresholds);
                    classified.push((user.clone(), verdict, idle));
                }

                guild.inactivity.last_check = Some(now);
                (classified, guild.inactivity.enforce)
            })
            .await?;

        let mut report = InactivityReport {
            enforced: enforce,
            ..InactivityReport::default()
        };

        for (user, verdict, idle) in classified {
            let entry = InactiveUser {
                id: user.id.clone(),
                name: user.name.clone(),
                last_activity: user.last_activity,
                inactive_days: idle.num_days(),
                already_disabled: user.is_disabled,
            };

            match verdict {
                Verdict::Active => continue,
                Verdict::Disable => {
                    if enforce && !user.is_disabled {
                        let mut policy = user.policy.clone();
                        policy.is_disabled = true;
                        let result = server.set_policy(&user.id, &policy).await;
                        report
                            .actions
                            .push(outcome(guild_id, &user, ActionKind::Disabled, result));
                    }
                    report.to_disable.push(entry);
                }
                Verdict::Delete => {
                    if enforce {
                        let result = server.delete_user(&user.id).await;
                        report
                            .actions
                            .push(outcome(guild_id, &user, ActionKind::Deleted, result));
                    }
                    report.to_delete.push(entry);
                }
            }
        }

        if enforce {
            // Deleted users no longer need a first-seen record.
            let deleted: Vec<String> = report
                .to_delete
                .iter()
                .filter(|user| user.last_activity.is_none())
                .map(|user| user.id.clone())
                .collect();
            if !deleted.is_empty() {
                self.settings
                    .update_guild(guild_id, |guild| {
                        for id in &deleted {
                            guild.inactivity.first_seen_inactive.remove(id);
                        }
                    })
                    .await?;
            }
        }

        tracing::info!(
            guild_id,
            to_disable = report.to_disable.len(),
            to_delete = report.to_delete.len(),
            enforced = enforce,
            "inactivity sweep finished"
        );
        Ok(report)
    }
}

fn outcome(
    guild_id: u64,
    user: &MediaUser,
    kind: ActionKind,
    result: Result<(), MediaError>,
) -> ActionOutcome {
    let error = match result {
        Ok(()) => None,
        Err(err) => {
            tracing::warn!(
                guild_id,
                user = %user.name,
                action = ?kind,
                error = %err,
                "inactivity action failed"
            );
            Some(err.to_string())
        }
    };

    ActionOutcome {
        user: user.name.clone(),
        kind,
        error,
    }
}
