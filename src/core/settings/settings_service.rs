use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::settings_models::{GlobalSettings, GuildSettings, SettingsDocument};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(String),
    #[error("failed to persist settings: {0}")]
    Store(String),
}

/// Persistence port for the settings document.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<SettingsDocument, SettingsError>;
    async fn save(&self, document: &SettingsDocument) -> Result<(), SettingsError>;
}

/// Owns the in-memory settings and serializes every change through one lock.
///
/// Updates mutate a copy, persist it, and only then replace the live
/// document; a failed save leaves readers seeing the previous state.
pub struct SettingsService<S: SettingsStore> {
    store: S,
    document: RwLock<SettingsDocument>,
}

impl<S: SettingsStore> SettingsService<S> {
    pub async fn new(store: S) -> Result<Self, SettingsError> {
        let document = store.load().await?;
        tracing::info!(guilds = document.guilds.len(), "settings loaded");

        Ok(Self {
            store,
            document: RwLock::new(document),
        })
    }

    /// Settings for one guild; defaults when the guild was never configured.
    pub async fn guild(&self, guild_id: u64) -> GuildSettings {
        self.document
            .read()
            .await
            .guilds
            .get(&guild_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn guilds(&self) -> Vec<(u64, GuildSettings)> {
        let document = self.document.read().await;
        let mut guilds: Vec<_> = document
            .guilds
            .iter()
            .map(|(id, settings)| (*id, settings.clone()))
            .collect();
        guilds.sort_by_key(|(id, _)| *id);
        guilds
    }

    pub async fn global(&self) -> GlobalSettings {
        self.document.read().await.global.clone()
    }

    pub async fn update_guild<F, R>(&self, guild_id: u64, apply: F) -> Result<R, SettingsError>
    where
        F: FnOnce(&mut GuildSettings) -> R,
    {
        self.try_update_guild(guild_id, |settings| Ok::<_, SettingsError>(apply(settings)))
            .await
    }

    /// Like `update_guild`, but `apply` may reject the change. Nothing is
    /// saved when it does.
    pub async fn try_update_guild<F, R, E>(&self, guild_id: u64, apply: F) -> Result<R, E>
    where
        F: FnOnce(&mut GuildSettings) -> Result<R, E>,
        E: From<SettingsError>,
    {
        self.modify(|document| apply(document.guilds.entry(guild_id).or_default()))
            .await
    }

    pub async fn update_global<F, R>(&self, apply: F) -> Result<R, SettingsError>
    where
        F: FnOnce(&mut GlobalSettings) -> R,
    {
        self.modify(|document| Ok::<_, SettingsError>(apply(&mut document.global)))
            .await
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    async fn modify<F, R, E>(&self, apply: F) -> Result<R, E>
    where
        F: FnOnce(&mut SettingsDocument) -> Result<R, E>,
        E: From<SettingsError>,
    {
        let mut live = self.document.write().await;
        let mut draft = live.clone();
        let result = apply(&mut draft)?;

        if draft != *live {
            self.store.save(&draft).await?;
            *live = draft;
        }
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Store that keeps the last saved document in memory.
    #[derive(Default)]
    pub struct MemoryStore {
        pub saved: Mutex<Option<SettingsDocument>>,
        pub fail_saves: AtomicBool,
        pub saves: AtomicUsize,
    }

    impl MemoryStore {
        pub fn last_saved(&self) -> Option<SettingsDocument> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SettingsStore for MemoryStore {
        async fn load(&self) -> Result<SettingsDocument, SettingsError> {
            Ok(self.saved.lock().unwrap().clone().unwrap_or_default())
        }

        async fn save(&self, document: &SettingsDocument) -> Result<(), SettingsError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(SettingsError::Store("disk full".into()));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.saved.lock().unwrap() = Some(document.clone());
            Ok(())
        }
    }

    pub async fn service() -> SettingsService<MemoryStore> {
        SettingsService::new(MemoryStore::default()).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::memory::{service, MemoryStore};
    use super::*;

    #[tokio::test]
    async fn unknown_guild_gets_defaults() {
        let settings = service().await;
        let guild = settings.guild(1).await;
        assert_eq!(guild, GuildSettings::default());
        assert!(settings.guilds().await.is_empty());
    }

    #[tokio::test]
    async fn update_persists_and_publishes() {
        let settings = service().await;

        let interval = settings
            .update_guild(7, |guild| {
                guild.inactivity.check_interval_hours = 12;
                guild.inactivity.check_interval_hours
            })
            .await
            .unwrap();

        assert_eq!(interval, 12);
        assert_eq!(settings.guild(7).await.inactivity.check_interval_hours, 12);
        let saved = settings.store.last_saved().unwrap();
        assert_eq!(saved.guilds[&7].inactivity.check_interval_hours, 12);
    }

    #[tokio::test]
    async fn failed_save_leaves_state_untouched() {
        let settings = service().await;
        settings
            .update_guild(7, |guild| guild.new_content.channel_id = Some(1))
            .await
            .unwrap();

        settings.store.fail_saves.store(true, Ordering::SeqCst);
        let result = settings
            .update_guild(7, |guild| guild.new_content.channel_id = Some(2))
            .await;

        assert!(matches!(result, Err(SettingsError::Store(_))));
        assert_eq!(settings.guild(7).await.new_content.channel_id, Some(1));
    }

    #[tokio::test]
    async fn rejected_update_saves_nothing() {
        let settings = service().await;

        let result: Result<(), SettingsError> = settings
            .try_update_guild(3, |guild| {
                guild.assistant.enabled_channels.insert(9);
                Err(SettingsError::Store("rejected".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(settings.guild(3).await.assistant.enabled_channels.is_empty());
        assert_eq!(settings.store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unchanged_document_is_not_rewritten() {
        let settings = service().await;
        settings.update_global(|global| global.ip_monitor.enabled).await.unwrap();
        assert_eq!(settings.store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_updates_do_not_lose_writes() {
        let settings = Arc::new(service().await);

        let mut handles = Vec::new();
        for channel in 0..25u64 {
            let settings = Arc::clone(&settings);
            handles.push(tokio::spawn(async move {
                settings
                    .update_guild(1, |guild| {
                        guild.assistant.enabled_channels.insert(channel);
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(settings.guild(1).await.assistant.enabled_channels.len(), 25);
    }

    #[tokio::test]
    async fn reload_sees_saved_document() {
        let store = MemoryStore::default();
        *store.saved.lock().unwrap() = Some(SettingsDocument {
            global: GlobalSettings::default(),
            guilds: [(5, GuildSettings::default())].into_iter().collect(),
        });

        let settings = SettingsService::new(store).await.unwrap();
        assert_eq!(settings.guilds().await.len(), 1);
    }
}
