use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::NetwatchError;
use crate::core::settings::{monitor_key, PortMonitor, SettingsService, SettingsStore};

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks whether a TCP port accepts connections.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Any failure (refused, unreachable, timeout, DNS) counts as closed.
    async fn is_open(&self, host: &str, port: u16, timeout: Duration) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    WentOffline,
    CameOnline,
}

#[derive(Debug, Clone)]
pub struct PortTransition {
    pub guild_id: u64,
    pub monitor: PortMonitor,
    pub kind: TransitionKind,
}

pub fn validate_port(port: i64) -> Result<u16, NetwatchError> {
    u16::try_from(port)
        .ok()
        .filter(|p| *p != 0)
        .ok_or(NetwatchError::InvalidPort(port))
}

fn validate_host(host: &str) -> Result<String, NetwatchError> {
    let host = host.trim().to_lowercase();
    let valid = !host.is_empty()
        && host.len() <= 253
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'));
    if valid {
        Ok(host)
    } else {
        Err(NetwatchError::InvalidHost(host))
    }
}

pub struct PortMonitorService<S: SettingsStore> {
    settings: Arc<SettingsService<S>>,
    probe: Arc<dyn PortProbe>,
    timeout: Duration,
}

impl<S: SettingsStore> PortMonitorService<S> {
    pub fn new(settings: Arc<SettingsService<S>>, probe: Arc<dyn PortProbe>) -> Self {
        Self {
            settings,
            probe,
            timeout: PROBE_TIMEOUT,
        }
    }

    pub async fn probe(&self, host: &str, port: i64) -> Result<bool, NetwatchError> {
        let host = validate_host(host)?;
        let port = validate_port(port)?;
        Ok(self.probe.is_open(&host, port, self.timeout).await)
    }

    /// Start watching `host:port`; the initial probe result is stored.
    pub async fn add(
        &self,
        guild_id: u64,
        host: &str,
        port: i64,
        channel_id: u64,
        added_by: u64,
        now: DateTime<Utc>,
    ) -> Result<PortMonitor, NetwatchError> {
        let host = validate_host(host)?;
        let port = validate_port(port)?;
        let key = monitor_key(&host, port);

        if self.settings.guild(guild_id).await.port_monitors.contains_key(&key) {
            return Err(NetwatchError::MonitorExists(key));
        }

        let online = self.probe.is_open(&host, port, self.timeout).await;
        let monitor = PortMonitor {
            host,
            port,
            channel_id,
            last_online: Some(online),
            added_by,
            added_at: now,
        };

        let stored = monitor.clone();
        self.settings
            .try_update_guild(guild_id, |guild| {
                if guild.port_monitors.contains_key(&key) {
                    return Err(NetwatchError::MonitorExists(key.clone()));
                }
                guild.port_monitors.insert(key.clone(), stored);
                Ok(())
            })
            .await?;

        tracing::info!(guild_id, monitor = %key, online, "port monitor added");
        Ok(monitor)
    }

    pub async fn remove(&self, guild_id: u64, host: &str, port: i64) -> Result<PortMonitor, NetwatchError> {
        let port = validate_port(port)?;
        let key = monitor_key(host, port);

        self.settings
            .try_update_guild(guild_id, |guild| {
                guild
                    .port_monitors
                    .remove(&key)
                    .ok_or_else(|| NetwatchError::MonitorNotFound(key.clone()))
            })
            .await
    }

    pub async fn list(&self, guild_id: u64) -> Vec<PortMonitor> {
        self.settings
            .guild(guild_id)
            .await
            .port_monitors
            .into_values()
            .collect()
    }

    /// Probe every monitor and report the ones whose state changed and was saved.
    pub async fn sweep(&self) -> Result<Vec<PortTransition>, NetwatchError> {
        let mut transitions = Vec::new();

        for (guild_id, guild) in self.settings.guilds().await {
            if guild.port_monitors.is_empty() {
                continue;
            }

            let mut observed = Vec::with_capacity(guild.port_monitors.len());
            let mut changed = Vec::new();
            for (key, monitor) in guild.port_monitors {
                let online = self.probe.is_open(&monitor.host, monitor.port, self.timeout).await;
                let kind = match (monitor.last_online, online) {
                    (Some(true), false) => Some(TransitionKind::WentOffline),
                    (Some(false), true) => Some(TransitionKind::CameOnline),
                    _ => None,
                };

                if monitor.last_online != Some(online) {
                    observed.push((key, online));
                }
                if let Some(kind) = kind {
                    let mut monitor = monitor;
                    monitor.last_online = Some(online);
                    tracing::info!(guild_id, monitor = %monitor.key(), ?kind, "port state changed");
                    changed.push(PortTransition {
                        guild_id,
                        monitor,
                        kind,
                    });
                }
            }

            if observed.is_empty() {
                continue;
            }
            let saved = self
                .settings
                .update_guild(guild_id, |guild| {
                    for (key, online) in &observed {
                        // Skip monitors removed while we were probing.
                        if let Some(monitor) = guild.port_monitors.get_mut(key) {
                            monitor.last_online = Some(*online);
                        }
                    }
                })
                .await;
            // Unsaved changes are detected again on the next sweep.
            match saved {
                Ok(()) => transitions.append(&mut changed),
                Err(err) => {
                    tracing::error!(guild_id, error = %err, "could not save port states, skipping guild")
                }
            }
        }

        Ok(transitions)
    }
}
