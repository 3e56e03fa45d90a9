use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::media::UserPolicy;

/// Connection details for a guild's media server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaServerSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

impl MediaServerSettings {
    /// Base URL without trailing slashes, if one is set.
    pub fn normalized_url(&self) -> Option<String> {
        self.url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.normalized_url().is_some()
            && self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    pub tmdb_api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InactivitySettings {
    pub notification_channel_id: Option<u64>,
    pub check_interval_hours: u64,
    pub disable_after_days: u32,
    pub delete_after_days: u32,
    /// When false the sweep only reports; nothing is disabled or deleted.
    pub enforce: bool,
    pub last_check: Option<DateTime<Utc>>,
    /// Users without any recorded activity, keyed by user id, with the time
    /// we first saw them that way.
    pub first_seen_inactive: HashMap<String, DateTime<Utc>>,
}

impl Default for InactivitySettings {
    fn default() -> Self {
        Self {
            notification_channel_id: None,
            check_interval_hours: 24,
            disable_after_days: 30,
            delete_after_days: 60,
            enforce: false,
            last_check: None,
            first_seen_inactive: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewContentSettings {
    pub channel_id: Option<u64>,
    pub check_interval_hours: u64,
    pub last_check: Option<DateTime<Utc>>,
}

impl Default for NewContentSettings {
    fn default() -> Self {
        Self {
            channel_id: None,
            check_interval_hours: 6,
            last_check: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationSettings {
    pub channel_id: Option<u64>,
    pub weekly: bool,
    /// ISO language code the overview is translated into, e.g. `ro`.
    pub translate_to: Option<String>,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            channel_id: None,
            weekly: true,
            translate_to: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryStatsSettings {
    pub channel_id: Option<u64>,
    pub message_id: Option<u64>,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningSettings {
    pub default_policy: UserPolicy,
}

/// One watched `host:port`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortMonitor {
    pub host: String,
    pub port: u16,
    pub channel_id: u64,
    #[serde(default)]
    pub last_online: Option<bool>,
    pub added_by: u64,
    pub added_at: DateTime<Utc>,
}

impl PortMonitor {
    pub fn key(&self) -> String {
        monitor_key(&self.host, self.port)
    }
}

pub fn monitor_key(host: &str, port: u16) -> String {
    format!("{}:{}", host.trim().to_lowercase(), port)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub enabled_channels: BTreeSet<u64>,
}

/// Everything the bot remembers about one guild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    pub media: MediaServerSettings,
    pub metadata: MetadataSettings,
    pub inactivity: InactivitySettings,
    pub new_content: NewContentSettings,
    pub recommendations: RecommendationSettings,
    pub library_stats: LibraryStatsSettings,
    pub provisioning: ProvisioningSettings,
    pub port_monitors: BTreeMap<String, PortMonitor>,
    pub assistant: AssistantSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpMonitorSettings {
    pub notify_user_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub use_channel: bool,
    pub last_ip: Option<String>,
    /// Local `HH:MM` at which the daily check runs.
    pub check_time: String,
    pub enabled: bool,
}

impl Default for IpMonitorSettings {
    fn default() -> Self {
        Self {
            notify_user_id: None,
            channel_id: None,
            use_channel: false,
            last_ip: None,
            check_time: "12:00".to_string(),
            enabled: true,
        }
    }
}

/// Settings that are not tied to a guild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub ip_monitor: IpMonitorSettings,
}

/// The persisted root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDocument {
    pub global: GlobalSettings,
    pub guilds: HashMap<u64, GuildSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_fills_defaults() {
        let raw = r#"{
            "guilds": {
                "42": { "media": { "url": "http://jf.local:8096/", "api_key": "k" } }
            }
        }"#;
        let doc: SettingsDocument = serde_json::from_str(raw).unwrap();

        let guild = &doc.guilds[&42];
        assert_eq!(
            guild.media.normalized_url().as_deref(),
            Some("http://jf.local:8096")
        );
        assert!(guild.media.is_configured());
        assert_eq!(guild.inactivity.check_interval_hours, 24);
        assert_eq!(guild.inactivity.disable_after_days, 30);
        assert_eq!(guild.inactivity.delete_after_days, 60);
        assert!(!guild.inactivity.enforce);
        assert_eq!(guild.new_content.check_interval_hours, 6);
        assert!(guild.recommendations.weekly);
        assert_eq!(doc.global.ip_monitor.check_time, "12:00");
        assert!(doc.global.ip_monitor.enabled);
    }

    #[test]
    fn blank_media_settings_are_not_configured() {
        let settings = MediaServerSettings {
            url: Some("  / ".into()),
            api_key: Some("key".into()),
        };
        assert!(!settings.is_configured());

        let settings = MediaServerSettings {
            url: Some("http://x".into()),
            api_key: Some("  ".into()),
        };
        assert!(!settings.is_configured());
    }

    #[test]
    fn monitor_keys_are_case_insensitive() {
        assert_eq!(monitor_key(" Example.COM ", 443), "example.com:443");
    }
}
