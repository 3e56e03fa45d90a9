use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::settings::{SettingsDocument, SettingsError, SettingsStore};

/// Keeps the whole settings document in one pretty-printed JSON file.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn load(&self) -> Result<SettingsDocument, SettingsError> {
        if !fs::try_exists(&self.path)
            .await
            .map_err(|e| SettingsError::Load(e.to_string()))?
        {
            tracing::info!(path = %self.path.display(), "no settings file yet, starting empty");
            return Ok(SettingsDocument::default());
        }

        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| SettingsError::Load(e.to_string()))?;

        serde_json::from_str(&text)
            .map_err(|e| SettingsError::Load(format!("{}: {}", self.path.display(), e)))
    }

    async fn save(&self, document: &SettingsDocument) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SettingsError::Store(e.to_string()))?;
        }

        let text = serde_json::to_string_pretty(document)
            .map_err(|e| SettingsError::Store(e.to_string()))?;

        // Write beside the target and rename so readers never see half a file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)
            .await
            .map_err(|e| SettingsError::Store(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| SettingsError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::SettingsService;

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::new(dir.path().join("settings.json"));

        assert_eq!(store.load().await.unwrap(), SettingsDocument::default());
    }

    #[tokio::test]
    async fn saved_document_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let service = SettingsService::new(JsonSettingsStore::new(&path)).await.unwrap();
        service
            .update_guild(7, |guild| {
                guild.media.url = Some("http://media.test".into());
                guild.inactivity.disable_after_days = 14;
            })
            .await
            .unwrap();
        service
            .update_global(|global| global.ip_monitor.last_ip = Some("1.2.3.4".into()))
            .await
            .unwrap();

        let reloaded = SettingsService::new(JsonSettingsStore::new(&path)).await.unwrap();
        let guild = reloaded.guild(7).await;
        assert_eq!(guild.media.url.as_deref(), Some("http://media.test"));
        assert_eq!(guild.inactivity.disable_after_days, 14);
        assert_eq!(
            reloaded.global().await.ip_monitor.last_ip.as_deref(),
            Some("1.2.3.4")
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            JsonSettingsStore::new(&path).load().await,
            Err(SettingsError::Load(_))
        ));
    }

    #[tokio::test]
    async fn older_files_without_new_sections_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"guilds":{"5":{"media":{"url":"http://x"}}}}"#).unwrap();

        let document = JsonSettingsStore::new(&path).load().await.unwrap();
        let guild = &document.guilds[&5];
        assert_eq!(guild.media.url.as_deref(), Some("http://x"));
        assert_eq!(guild.new_content.check_interval_hours, 6);
        assert_eq!(document.global.ip_monitor.check_time, "12:00");
    }
}
