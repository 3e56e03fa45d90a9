use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::media_models::{
    MediaError, MediaFolder, MediaItem, MediaUser, ServerInfo, UserPolicy,
};
use crate::core::settings::MediaServerSettings;

/// The media-server operations the bot relies on.
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Base URL used to build links to the web client.
    fn base_url(&self) -> &str;

    async fn list_users(&self) -> Result<Vec<MediaUser>, MediaError>;
    async fn search_items(&self, query: &str, limit: usize) -> Result<Vec<MediaItem>, MediaError>;
    async fn random_item(&self) -> Result<Option<MediaItem>, MediaError>;
    async fn items_added_since(&self, since: DateTime<Utc>) -> Result<Vec<MediaItem>, MediaError>;
    async fn media_folders(&self) -> Result<Vec<MediaFolder>, MediaError>;
    async fn item_count(&self, parent_id: &str) -> Result<u64, MediaError>;
    async fn server_info(&self) -> Result<ServerInfo, MediaError>;
    async fn create_user(&self, name: &str, password: &str) -> Result<MediaUser, MediaError>;
    async fn set_policy(&self, user_id: &str, policy: &UserPolicy) -> Result<(), MediaError>;
    async fn delete_user(&self, user_id: &str) -> Result<(), MediaError>;
}

/// Builds a client for whatever server a guild has configured.
pub trait MediaConnector: Send + Sync {
    fn connect(&self, settings: &MediaServerSettings) -> Result<Arc<dyn MediaServer>, MediaError>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::core::media::media_models::ItemKind;

    /// In-memory media server used by the service tests.
    #[derive(Default)]
    pub struct FakeMediaServer {
        pub users: Mutex<Vec<MediaUser>>,
        pub items: Mutex<Vec<MediaItem>>,
        pub folders: Vec<(MediaFolder, u64)>,
        pub server_name: Option<String>,
        pub fail_users: bool,
        pub fail_policy: bool,
        pub fail_delete_for: Vec<String>,
        pub policies: Mutex<HashMap<String, UserPolicy>>,
        pub deleted: Mutex<Vec<String>>,
        pub since_calls: Mutex<Vec<DateTime<Utc>>>,
    }

    impl FakeMediaServer {
        pub fn with_users(users: Vec<MediaUser>) -> Self {
            Self {
                users: Mutex::new(users),
                ..Self::default()
            }
        }

        pub fn with_items(items: Vec<MediaItem>) -> Self {
            Self {
                items: Mutex::new(items),
                ..Self::default()
            }
        }
    }

    pub fn user(id: &str, last_activity: Option<DateTime<Utc>>) -> MediaUser {
        MediaUser {
            id: id.to_string(),
            name: format!("user-{id}"),
            last_activity,
            is_admin: false,
            is_disabled: false,
            policy: UserPolicy::default(),
        }
    }

    pub fn item(id: &str, name: &str, created: Option<DateTime<Utc>>) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            name: name.to_string(),
            kind: ItemKind::Movie,
            year: Some(2020),
            overview: Some(format!("{name} overview")),
            genres: vec!["Drama".into()],
            community_rating: Some(7.5),
            official_rating: None,
            runtime_ticks: None,
            studios: Vec::new(),
            premiere_date: None,
            date_created: created,
        }
    }

    #[async_trait]
    impl MediaServer for FakeMediaServer {
        fn base_url(&self) -> &str {
            "http://media.test"
        }

        async fn list_users(&self) -> Result<Vec<MediaUser>, MediaError> {
            if self.fail_users {
                return Err(MediaError::Http("connection refused".into()));
            }
            Ok(self.users.lock().unwrap().clone())
        }

        async fn search_items(&self, query: &str, limit: usize) -> Result<Vec<MediaItem>, MediaError> {
            let query = query.to_lowercase();
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .filter(|item| item.name.to_lowercase().contains(&query))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn random_item(&self) -> Result<Option<MediaItem>, MediaError> {
            Ok(self.items.lock().unwrap().first().cloned())
        }

        async fn items_added_since(&self, since: DateTime<Utc>) -> Result<Vec<MediaItem>, MediaError> {
            self.since_calls.lock().unwrap().push(since);
            Ok(self.items.lock().unwrap().clone())
        }

        async fn media_folders(&self) -> Result<Vec<MediaFolder>, MediaError> {
            Ok(self.folders.iter().map(|(folder, _)| folder.clone()).collect())
        }

        async fn item_count(&self, parent_id: &str) -> Result<u64, MediaError> {
            self.folders
                .iter()
                .find(|(folder, _)| folder.id == parent_id)
                .map(|(_, count)| *count)
                .ok_or_else(|| MediaError::Status {
                    status: 404,
                    body: String::new(),
                })
        }

        async fn server_info(&self) -> Result<ServerInfo, MediaError> {
            Ok(ServerInfo {
                server_name: self.server_name.clone(),
                version: None,
            })
        }

        async fn create_user(&self, name: &str, _password: &str) -> Result<MediaUser, MediaError> {
            let mut users = self.users.lock().unwrap();
            let created = MediaUser {
                id: format!("id-{}", users.len() + 1),
                name: name.to_string(),
                last_activity: None,
                is_admin: false,
                is_disabled: false,
                policy: UserPolicy::default(),
            };
            users.push(created.clone());
            Ok(created)
        }

        async fn set_policy(&self, user_id: &str, policy: &UserPolicy) -> Result<(), MediaError> {
            if self.fail_policy {
                return Err(MediaError::Status {
                    status: 400,
                    body: "bad policy".into(),
                });
            }
            self.policies
                .lock()
                .unwrap()
                .insert(user_id.to_string(), policy.clone());
            Ok(())
        }

        async fn delete_user(&self, user_id: &str) -> Result<(), MediaError> {
            if self.fail_delete_for.iter().any(|id| id == user_id) {
                return Err(MediaError::Status {
                    status: 500,
                    body: "nope".into(),
                });
            }
            self.users.lock().unwrap().retain(|user| user.id != user_id);
            self.deleted.lock().unwrap().push(user_id.to_string());
            Ok(())
        }
    }

    /// Connector that hands out the same fake for every configured guild.
    pub struct FakeConnector(pub Arc<FakeMediaServer>);

    impl MediaConnector for FakeConnector {
        fn connect(&self, settings: &MediaServerSettings) -> Result<Arc<dyn MediaServer>, MediaError> {
            if !settings.is_configured() {
                return Err(MediaError::NotConfigured);
            }
            let server: Arc<dyn MediaServer> = self.0.clone();
            Ok(server)
        }
    }
}
