use std::sync::Arc;

use super::enrichment::{describe, ItemCard};
use super::media_models::{MediaError, MediaItem, ServerInfo};
use super::media_server::MediaConnector;
use crate::core::metadata::MetadataProvider;
use crate::core::settings::{SettingsService, SettingsStore};
use crate::core::translation::Translator;

pub const SEARCH_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct SearchResults {
    pub base_url: String,
    pub items: Vec<MediaItem>,
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub card: ItemCard,
    /// Language the overview was translated into, when translation succeeded.
    pub translated_to: Option<String>,
}

/// Search, recommendations and server connection settings.
pub struct CatalogService<S: SettingsStore> {
    settings: Arc<SettingsService<S>>,
    connector: Arc<dyn MediaConnector>,
    metadata: Arc<dyn MetadataProvider>,
    translator: Arc<dyn Translator>,
}

impl<S: SettingsStore> CatalogService<S> {
    pub fn new(
        settings: Arc<SettingsService<S>>,
        connector: Arc<dyn MediaConnector>,
        metadata: Arc<dyn MetadataProvider>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            settings,
            connector,
            metadata,
            translator,
        }
    }

    /// Store the server URL and API key for a guild.
    pub async fn configure_server(
        &self,
        guild_id: u64,
        url: &str,
        api_key: &str,
    ) -> Result<(), MediaError> {
        let url = url.trim().trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(MediaError::Invalid(format!("`{url}` is not an http(s) URL")));
        }
        let api_key = api_key.trim().to_string();

        self.settings
            .update_guild(guild_id, |guild| {
                guild.media.url = Some(url);
                guild.media.api_key = Some(api_key);
            })
            .await?;
        tracing::info!(guild_id, "media server configured");
        Ok(())
    }

    pub async fn test_connection(&self, guild_id: u64) -> Result<ServerInfo, MediaError> {
        let guild = self.settings.guild(guild_id).await;
        let server = self.connector.connect(&guild.media)?;
        server.server_info().await
    }

    pub async fn set_tmdb_key(&self, guild_id: u64, api_key: Option<String>) -> Result<(), MediaError> {
        let api_key = api_key.map(|key| key.trim().to_string()).filter(|key| !key.is_empty());
        self.settings
            .update_guild(guild_id, |guild| guild.metadata.tmdb_api_key = api_key)
            .await?;
        Ok(())
    }

    pub async fn search(&self, guild_id: u64, query: &str) -> Result<SearchResults, MediaError> {
        let guild = self.settings.guild(guild_id).await;
        let server = self.connector.connect(&guild.media)?;

        let query = query.trim();
        let items = if query.is_empty() {
            Vec::new()
        } else {
            let mut items = server.search_items(query, SEARCH_LIMIT).await?;
            items.truncate(SEARCH_LIMIT);
            items
        };

        Ok(SearchResults {
            base_url: server.base_url().to_string(),
            items,
        })
    }

    /// Pick a random movie or series and dress it up for posting.
    pub async fn recommend(&self, guild_id: u64) -> Result<Option<Recommendation>, MediaError> {
        let guild = self.settings.guild(guild_id).await;
        let server = self.connector.connect(&guild.media)?;

        let Some(item) = server.random_item().await? else {
            return Ok(None);
        };

        let mut card = describe(
            self.metadata.as_ref(),
            guild.metadata.tmdb_api_key.as_deref(),
            server.base_url(),
            item,
        )
        .await;

        let mut translated_to = None;
        let target = guild.recommendations.translate_to.clone();
        if let (Some(lang), Some(overview)) = (target, card.overview.clone()) {
            match self.translator.translate(&overview, &lang).await {
                Ok(text) => {
                    card.overview = Some(text);
                    translated_to = Some(lang);
                }
                Err(err) => {
                    tracing::warn!(guild_id, lang = %lang, error = %err, "translation failed, keeping original overview");
                }
            }
        }

        Ok(Some(Recommendation {
            card,
            translated_to,
        }))
    }

    pub async fn set_recommendation_channel(
        &self,
        guild_id: u64,
        channel_id: Option<u64>,
    ) -> Result<(), MediaError> {
        self.settings
            .update_guild(guild_id, |guild| guild.recommendations.channel_id = channel_id)
            .await?;
        Ok(())
    }

    pub async fn set_weekly(&self, guild_id: u64, weekly: bool) -> Result<(), MediaError> {
        self.settings
            .update_guild(guild_id, |guild| guild.recommendations.weekly = weekly)
            .await?;
        Ok(())
    }

    pub async fn set_translation(&self, guild_id: u64, lang: Option<String>) -> Result<(), MediaError> {
        let lang = lang
            .map(|code| code.trim().to_lowercase())
            .filter(|code| !code.is_empty());
        if let Some(code) = &lang {
            if code.len() > 8 || !code.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
                return Err(MediaError::Invalid(format!("`{code}` is not a language code")));
            }
        }

        self.settings
            .update_guild(guild_id, |guild| guild.recommendations.translate_to = lang)
            .await?;
        Ok(())
    }

    /// `(guild, channel)` pairs that get the weekly recommendation.
    pub async fn weekly_targets(&self) -> Vec<(u64, u64)> {
        self.settings
            .guilds()
            .await
            .into_iter()
            .filter(|(_, guild)| guild.media.is_configured() && guild.recommendations.weekly)
            .filter_map(|(id, guild)| guild.recommendations.channel_id.map(|ch| (id, ch)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::core::media::enrichment::fake::FakeMetadata;
    use crate::core::media::media_server::fake::{item, FakeConnector, FakeMediaServer};
    use crate::core::settings::settings_service::memory::{service, MemoryStore};
    use crate::core::translation::TranslateError;

    struct Shouting {
        fail: bool,
    }

    #[async_trait]
    impl Translator for Shouting {
        async fn translate(&self, text: &str, _target: &str) -> Result<String, TranslateError> {
            if self.fail {
                Err(TranslateError::Status(503))
            } else {
                Ok(text.to_uppercase())
            }
        }
    }

    async fn catalog(
        server: FakeMediaServer,
        translate_fails: bool,
    ) -> (CatalogService<MemoryStore>, Arc<SettingsService<MemoryStore>>) {
        let settings = Arc::new(service().await);
        let catalog = CatalogService::new(
            Arc::clone(&settings),
            Arc::new(FakeConnector(Arc::new(server))),
            Arc::new(FakeMetadata::default()),
            Arc::new(Shouting {
                fail: translate_fails,
            }),
        );
        catalog
            .configure_server(1, "http://media.test/", "key")
            .await
            .unwrap();
        (catalog, settings)
    }

    #[tokio::test]
    async fn configure_normalizes_and_validates_url() {
        let (catalog, settings) = catalog(FakeMediaServer::default(), false).await;
        assert_eq!(
            settings.guild(1).await.media.url.as_deref(),
            Some("http://media.test")
        );
        assert!(catalog.configure_server(1, "ftp://x", "k").await.is_err());
    }

    #[tokio::test]
    async fn search_caps_results() {
        let items = (0..8)
            .map(|i| item(&i.to_string(), &format!("Star Trek {i}"), None))
            .collect();
        let (catalog, _) = catalog(FakeMediaServer::with_items(items), false).await;

        let results = catalog.search(1, "star trek").await.unwrap();
        assert_eq!(results.items.len(), SEARCH_LIMIT);
        assert_eq!(results.base_url, "http://media.test");

        assert!(catalog.search(1, "   ").await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn search_requires_configuration() {
        let (catalog, _) = catalog(FakeMediaServer::default(), false).await;
        assert!(matches!(
            catalog.search(2, "x").await,
            Err(MediaError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn recommendation_is_translated_when_requested() {
        let server = FakeMediaServer::with_items(vec![item("1", "Heat", None)]);
        let (catalog, _) = catalog(server, false).await;
        catalog.set_translation(1, Some("RO".into())).await.unwrap();

        let rec = catalog.recommend(1).await.unwrap().unwrap();
        assert_eq!(rec.card.overview.as_deref(), Some("HEAT OVERVIEW"));
        assert_eq!(rec.translated_to.as_deref(), Some("ro"));
    }

    #[tokio::test]
    async fn translation_failure_keeps_original_text() {
        let server = FakeMediaServer::with_items(vec![item("1", "Heat", None)]);
        let (catalog, _) = catalog(server, true).await;
        catalog.set_translation(1, Some("ro".into())).await.unwrap();

        let rec = catalog.recommend(1).await.unwrap().unwrap();
        assert_eq!(rec.card.overview.as_deref(), Some("Heat overview"));
        assert_eq!(rec.translated_to, None);
    }

    #[tokio::test]
    async fn empty_library_has_no_recommendation() {
        let (catalog, _) = catalog(FakeMediaServer::default(), false).await;
        assert!(catalog.recommend(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn weekly_targets_need_channel_and_flag() {
        let (catalog, _) = catalog(FakeMediaServer::default(), false).await;
        assert!(catalog.weekly_targets().await.is_empty());

        catalog.set_recommendation_channel(1, Some(55)).await.unwrap();
        assert_eq!(catalog.weekly_targets().await, vec![(1, 55)]);

        catalog.set_weekly(1, false).await.unwrap();
        assert!(catalog.weekly_targets().await.is_empty());
    }

    #[tokio::test]
    async fn language_codes_are_validated() {
        let (catalog, _) = catalog(FakeMediaServer::default(), false).await;
        assert!(catalog.set_translation(1, Some("pt-BR".into())).await.is_ok());
        assert!(catalog.set_translation(1, Some("not a lang".into())).await.is_err());
    }
}
