use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::settings::SettingsError;

/// Ticks are 100ns units on Jellyfin.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// One year. Longer check intervals are rejected.
pub const MAX_CHECK_INTERVAL_HOURS: u64 = 24 * 365;

pub fn validate_interval(hours: u64) -> Result<u64, MediaError> {
    if (1..=MAX_CHECK_INTERVAL_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(MediaError::InvalidInterval(hours))
    }
}

/// Stored intervals are clamped so hand-edited settings cannot overflow.
pub fn check_interval(hours: u64) -> chrono::Duration {
    let hours = hours.clamp(1, MAX_CHECK_INTERVAL_HOURS);
    chrono::Duration::hours(hours as i64)
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("the media server is not configured for this server")]
    NotConfigured,
    #[error("media server request failed: {0}")]
    Http(String),
    #[error("media server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected media server response: {0}")]
    Decode(String),
    #[error("a user named `{0}` already exists")]
    UserExists(String),
    #[error("no user named `{0}`")]
    UserNotFound(String),
    #[error("user `{user}` was created but the policy could not be applied: {reason}")]
    PolicyNotApplied { user: String, reason: String },
    #[error("unknown policy setting `{0}`")]
    UnknownPolicyField(String),
    #[error("`{value}` is not a valid value for `{field}` (expected {expected})")]
    InvalidPolicyValue {
        field: String,
        value: String,
        expected: &'static str,
    },
    #[error("invalid thresholds: disable after {disable_after} days must be below delete after {delete_after} days")]
    InvalidThresholds { disable_after: u32, delete_after: u32 },
    #[error("{0}")]
    Invalid(String),
    #[error("check interval must be between 1 and {MAX_CHECK_INTERVAL_HOURS} hours, got {0}")]
    InvalidInterval(u64),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// What kind of library entry an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Movie,
    Series,
    Other,
}

impl ItemKind {
    pub fn from_jellyfin(raw: &str) -> Self {
        match raw {
            "Movie" => Self::Movie,
            "Series" => Self::Series,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Series => "Series",
            Self::Other => "Item",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaUser {
    pub id: String,
    pub name: String,
    pub last_activity: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub is_disabled: bool,
    pub policy: UserPolicy,
}

#[derive(Debug, Clone)]
pub struct MediaItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub year: Option<i32>,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    pub community_rating: Option<f64>,
    pub official_rating: Option<String>,
    pub runtime_ticks: Option<i64>,
    pub studios: Vec<String>,
    pub premiere_date: Option<DateTime<Utc>>,
    pub date_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct MediaFolder {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub server_name: Option<String>,
    pub version: Option<String>,
}

/// Access policy applied to a media-server account.
///
/// Known flags are typed; anything else the server sends back (provider ids,
/// newer fields) rides along in `extra` so a read-modify-write keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserPolicy {
    pub is_administrator: bool,
    pub is_hidden: bool,
    pub is_disabled: bool,
    pub enable_remote_control_of_other_users: bool,
    pub enable_shared_device_control: bool,
    pub enable_remote_access: bool,
    pub enable_live_tv_management: bool,
    pub enable_live_tv_access: bool,
    pub enable_media_playback: bool,
    pub enable_audio_playback_transcoding: bool,
    pub enable_video_playback_transcoding: bool,
    pub enable_playback_remuxing: bool,
    pub enable_content_deletion: bool,
    pub enable_content_downloading: bool,
    pub enable_subtitle_management: bool,
    pub enable_sync_transcoding: bool,
    pub enable_media_conversion: bool,
    pub enable_public_sharing: bool,
    pub enable_all_devices: bool,
    pub enable_all_channels: bool,
    pub enable_all_folders: bool,
    pub invalid_login_attempt_count: i64,
    pub remote_client_bitrate_limit: i64,
    pub simultaneous_stream_limit: i64,
    pub access_schedules: Vec<Value>,
    pub blocked_tags: Vec<String>,
    pub enabled_devices: Vec<String>,
    pub enabled_channels: Vec<String>,
    pub enabled_folders: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UserPolicy {
    fn default() -> Self {
        Self {
            is_administrator: false,
            is_hidden: false,
            is_disabled: false,
            enable_remote_control_of_other_users: false,
            enable_shared_device_control: false,
            enable_remote_access: true,
            enable_live_tv_management: false,
            enable_live_tv_access: true,
            enable_media_playback: true,
            enable_audio_playback_transcoding: true,
            enable_video_playback_transcoding: true,
            enable_playback_remuxing: true,
            enable_content_deletion: false,
            enable_content_downloading: true,
            enable_subtitle_management: false,
            enable_sync_transcoding: true,
            enable_media_conversion: false,
            enable_public_sharing: false,
            enable_all_devices: true,
            enable_all_channels: true,
            enable_all_folders: true,
            invalid_login_attempt_count: 0,
            remote_client_bitrate_limit: 0,
            simultaneous_stream_limit: 3,
            access_schedules: Vec::new(),
            blocked_tags: Vec::new(),
            enabled_devices: Vec::new(),
            enabled_channels: Vec::new(),
            enabled_folders: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl UserPolicy {
    /// Set one scalar field by its wire name, e.g. `EnableRemoteAccess`.
    ///
    /// Flags accept `true`/`false`, limits accept a non-negative integer.
    pub fn set_field(&mut self, field: &str, raw: &str) -> Result<(), MediaError> {
        let mut map = match serde_json::to_value(&*self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(MediaError::Decode("policy is not an object".into())),
            Err(err) => return Err(MediaError::Decode(err.to_string())),
        };

        let current = match map.get(field) {
            Some(value) if !self.extra.contains_key(field) => value,
            _ => return Err(MediaError::UnknownPolicyField(field.to_string())),
        };

        let raw = raw.trim();
        let parsed = match current {
            Value::Bool(_) => match raw.to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(invalid_value(field, raw, "true or false")),
            },
            Value::Number(_) => match raw.parse::<u32>() {
                Ok(number) => Value::from(number),
                Err(_) => return Err(invalid_value(field, raw, "a whole number")),
            },
            _ => return Err(MediaError::UnknownPolicyField(field.to_string())),
        };

        map.insert(field.to_string(), parsed);
        *self = serde_json::from_value(Value::Object(map))
            .map_err(|err| MediaError::Decode(err.to_string()))?;
        Ok(())
    }

    /// Scalar fields as `(name, value)` pairs, sorted by name.
    pub fn scalar_fields(&self) -> Vec<(String, String)> {
        let Ok(Value::Object(map)) = serde_json::to_value(self) else {
            return Vec::new();
        };

        map.into_iter()
            .filter(|(key, _)| !self.extra.contains_key(key))
            .filter_map(|(key, value)| match value {
                Value::Bool(flag) => Some((key, flag.to_string())),
                Value::Number(number) => Some((key, number.to_string())),
                _ => None,
            })
            .collect()
    }

    /// Copy server-managed fields this policy does not know about from `other`.
    pub fn inherit_unknown(&mut self, other: &UserPolicy) {
        for (key, value) in &other.extra {
            self.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

fn invalid_value(field: &str, raw: &str, expected: &'static str) -> MediaError {
    MediaError::InvalidPolicyValue {
        field: field.to_string(),
        value: raw.to_string(),
        expected,
    }
}

/// Render a runtime in ticks as `1h 5m`, `45m` or `N/A`.
pub fn format_runtime(ticks: Option<i64>) -> String {
    let Some(ticks) = ticks.filter(|t| *t > 0) else {
        return "N/A".to_string();
    };

    let total_minutes = ticks / TICKS_PER_SECOND / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

pub fn details_url(base: &str, item_id: &str) -> String {
    format!(
        "{}/web/index.html#!/details?id={}",
        base.trim_end_matches('/'),
        item_id
    )
}

pub fn play_url(base: &str, item_id: &str) -> String {
    format!(
        "{}&serverId=1&autoplay=true",
        details_url(base, item_id)
    )
}

/// Cut `text` to at most `max` characters, ending in `...` when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_formatting() {
        let minute = 60 * TICKS_PER_SECOND;
        assert_eq!(format_runtime(Some(65 * minute)), "1h 5m");
        assert_eq!(format_runtime(Some(45 * minute)), "45m");
        assert_eq!(format_runtime(Some(120 * minute)), "2h 0m");
        assert_eq!(format_runtime(Some(0)), "N/A");
        assert_eq!(format_runtime(None), "N/A");
    }

    #[test]
    fn urls_ignore_trailing_slash() {
        assert_eq!(
            details_url("http://media.local:8096/", "abc"),
            "http://media.local:8096/web/index.html#!/details?id=abc"
        );
        assert_eq!(
            play_url("http://media.local:8096", "abc"),
            "http://media.local:8096/web/index.html#!/details?id=abc&serverId=1&autoplay=true"
        );
    }

    #[test]
    fn truncate_appends_ellipsis_within_limit() {
        assert_eq!(truncate("short", 10), "short");

        let long = "a".repeat(1200);
        let cut = truncate(&long, 1000);
        assert_eq!(cut.chars().count(), 1000);
        assert!(cut.ends_with("..."));

        assert_eq!(truncate("ăîșțâăîșț", 5), "ăî...");
    }

    #[test]
    fn policy_serializes_with_wire_names() {
        let value = serde_json::to_value(UserPolicy::default()).unwrap();
        assert_eq!(value["EnableRemoteAccess"], Value::Bool(true));
        assert_eq!(value["SimultaneousStreamLimit"], Value::from(3));
        assert_eq!(value["IsAdministrator"], Value::Bool(false));
    }

    #[test]
    fn set_field_parses_by_field_type() {
        let mut policy = UserPolicy::default();

        policy.set_field("EnableRemoteAccess", "FALSE").unwrap();
        assert!(!policy.enable_remote_access);

        policy.set_field("SimultaneousStreamLimit", "5").unwrap();
        assert_eq!(policy.simultaneous_stream_limit, 5);

        assert!(matches!(
            policy.set_field("EnableRemoteAccess", "7"),
            Err(MediaError::InvalidPolicyValue { .. })
        ));
        assert!(matches!(
            policy.set_field("SimultaneousStreamLimit", "lots"),
            Err(MediaError::InvalidPolicyValue { .. })
        ));
        assert!(matches!(
            policy.set_field("BlockedTags", "true"),
            Err(MediaError::UnknownPolicyField(_))
        ));
        assert!(matches!(
            policy.set_field("NotAField", "true"),
            Err(MediaError::UnknownPolicyField(_))
        ));
    }

    #[test]
    fn unknown_server_fields_survive_roundtrip() {
        let raw = serde_json::json!({
            "IsAdministrator": true,
            "AuthenticationProviderId": "Default",
        });
        let mut policy: UserPolicy = serde_json::from_value(raw).unwrap();
        assert!(policy.is_administrator);
        assert!(policy.enable_media_playback);

        policy.is_disabled = true;
        let back = serde_json::to_value(&policy).unwrap();
        assert_eq!(back["AuthenticationProviderId"], "Default");
        assert_eq!(back["IsDisabled"], true);

        // Server-only fields are not editable by name.
        assert!(policy.set_field("AuthenticationProviderId", "true").is_err());
    }

    #[test]
    fn inherit_unknown_keeps_local_values() {
        let mut local = UserPolicy::default();
        local.extra.insert("Custom".into(), Value::from(1));

        let mut server = UserPolicy::default();
        server.extra.insert("Custom".into(), Value::from(2));
        server
            .extra
            .insert("PasswordResetProviderId".into(), Value::from("Default"));

        local.inherit_unknown(&server);
        assert_eq!(local.extra["Custom"], Value::from(1));
        assert_eq!(local.extra["PasswordResetProviderId"], "Default");
    }
}
