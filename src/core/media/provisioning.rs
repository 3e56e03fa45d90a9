use std::sync::Arc;

use rand::seq::SliceRandom;

use super::media_models::{MediaError, MediaUser, UserPolicy};
use super::media_server::{MediaConnector, MediaServer};
use crate::core::settings::{SettingsService, SettingsStore};

pub const PASSWORD_LENGTH: usize = 8;
const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_=+";
const FALLBACK_SERVER_NAME: &str = "Jellyfin";

pub fn generate_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .filter_map(|_| PASSWORD_CHARSET.choose(&mut rng))
        .map(|byte| char::from(*byte))
        .collect()
}

/// Credentials for a freshly created account.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub user_id: String,
    pub name: String,
    pub password: String,
    pub server_name: String,
}

/// Creates and removes media-server accounts on behalf of guild admins.
pub struct ProvisioningService<S: SettingsStore> {
    settings: Arc<SettingsService<S>>,
    connector: Arc<dyn MediaConnector>,
}

impl<S: SettingsStore> ProvisioningService<S> {
    pub fn new(settings: Arc<SettingsService<S>>, connector: Arc<dyn MediaConnector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    async fn server(&self, guild_id: u64) -> Result<(Arc<dyn MediaServer>, UserPolicy), MediaError> {
        let guild = self.settings.guild(guild_id).await;
        let server = self.connector.connect(&guild.media)?;
        Ok((server, guild.provisioning.default_policy))
    }

    pub async fn create_account(&self, guild_id: u64, name: &str) -> Result<CreatedAccount, MediaError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MediaError::Invalid("user name cannot be empty".into()));
        }

        let (server, default_policy) = self.server(guild_id).await?;

        let existing = server.list_users().await?;
        if existing.iter().any(|user| user.name.eq_ignore_ascii_case(name)) {
            return Err(MediaError::UserExists(name.to_string()));
        }

        let password = generate_password(PASSWORD_LENGTH);
        let created = server.create_user(name, &password).await?;

        let mut policy = default_policy;
        policy.inherit_unknown(&created.policy);
        if let Err(err) = server.set_policy(&created.id, &policy).await {
            tracing::warn!(guild_id, user = %created.name, error = %err, "policy update failed after account creation");
            return Err(MediaError::PolicyNotApplied {
                user: created.name,
                reason: err.to_string(),
            });
        }

        let server_name = match server.server_info().await {
            Ok(info) => info.server_name.filter(|n| !n.trim().is_empty()),
            Err(err) => {
                tracing::debug!(error = %err, "could not read server name");
                None
            }
        }
        .unwrap_or_else(|| FALLBACK_SERVER_NAME.to_string());

        tracing::info!(guild_id, user = %created.name, "media account created");
        Ok(CreatedAccount {
            user_id: created.id,
            name: created.name,
            password,
            server_name,
        })
    }

    pub async fn list_accounts(&self, guild_id: u64) -> Result<Vec<MediaUser>, MediaError> {
        let (server, _) = self.server(guild_id).await?;
        let mut users = server.list_users().await?;
        users.sort_by_key(|user| user.name.to_lowercase());
        Ok(users)
    }

    /// Delete the account whose name matches case-insensitively.
    pub async fn delete_account(&self, guild_id: u64, name: &str) -> Result<MediaUser, MediaError> {
        let (server, _) = self.server(guild_id).await?;
        let name = name.trim();

        let user = server
            .list_users()
            .await?
            .into_iter()
            .find(|user| user.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| MediaError::UserNotFound(name.to_string()))?;

        server.delete_user(&user.id).await?;
        tracing::info!(guild_id, user = %user.name, "media account deleted");
        Ok(user)
    }

    pub async fn default_policy(&self, guild_id: u64) -> UserPolicy {
        self.settings.guild(guild_id).await.provisioning.default_policy
    }

    pub async fn set_default_policy(
        &self,
        guild_id: u64,
        field: &str,
        value: &str,
    ) -> Result<UserPolicy, MediaError> {
        self.settings
            .try_update_guild(guild_id, |guild| {
                guild.provisioning.default_policy.set_field(field, value)?;
                Ok(guild.provisioning.default_policy.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::media_server::fake::{user, FakeConnector, FakeMediaServer};
    use crate::core::settings::settings_service::memory::{service, MemoryStore};

    async fn setup(server: FakeMediaServer) -> (ProvisioningService<MemoryStore>, Arc<FakeMediaServer>) {
        let settings = Arc::new(service().await);
        settings
            .update_guild(1, |guild| {
                guild.media.url = Some("http://media.test".into());
                guild.media.api_key = Some("key".into());
            })
            .await
            .unwrap();
        let server = Arc::new(server);
        let service = ProvisioningService::new(settings, Arc::new(FakeConnector(Arc::clone(&server))));
        (service, server)
    }

    #[test]
    fn passwords_use_the_allowed_alphabet() {
        let password = generate_password(64);
        assert_eq!(password.chars().count(), 64);
        assert!(password.bytes().all(|b| PASSWORD_CHARSET.contains(&b)));
        assert_eq!(generate_password(PASSWORD_LENGTH).len(), 8);
    }

    #[tokio::test]
    async fn creates_account_with_default_policy() {
        let server = FakeMediaServer {
            server_name: Some("Freia".into()),
            ..FakeMediaServer::default()
        };
        let (service, server) = setup(server).await;
        service
            .set_default_policy(1, "SimultaneousStreamLimit", "2")
            .await
            .unwrap();

        let account = service.create_account(1, "alice").await.unwrap();

        assert_eq!(account.name, "alice");
        assert_eq!(account.server_name, "Freia");
        assert_eq!(account.password.len(), PASSWORD_LENGTH);
        let policies = server.policies.lock().unwrap();
        assert_eq!(policies[&account.user_id].simultaneous_stream_limit, 2);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected_case_insensitively() {
        let mut existing = user("1", None);
        existing.name = "Alice".into();
        let (service, _) = setup(FakeMediaServer::with_users(vec![existing])).await;

        assert!(matches!(
            service.create_account(1, "alice").await,
            Err(MediaError::UserExists(_))
        ));
    }

    #[tokio::test]
    async fn policy_failure_is_reported_but_user_exists() {
        let server = FakeMediaServer {
            fail_policy: true,
            ..FakeMediaServer::default()
        };
        let (service, server) = setup(server).await;

        assert!(matches!(
            service.create_account(1, "bob").await,
            Err(MediaError::PolicyNotApplied { .. })
        ));
        assert_eq!(server.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn server_name_falls_back() {
        let (service, _) = setup(FakeMediaServer::default()).await;
        let account = service.create_account(1, "carol").await.unwrap();
        assert_eq!(account.server_name, "Jellyfin");
    }

    #[tokio::test]
    async fn delete_matches_names_case_insensitively() {
        let mut target = user("7", None);
        target.name = "Dave".into();
        let (service, server) = setup(FakeMediaServer::with_users(vec![target])).await;

        let deleted = service.delete_account(1, "DAVE").await.unwrap();
        assert_eq!(deleted.id, "7");
        assert_eq!(*server.deleted.lock().unwrap(), vec!["7".to_string()]);

        assert!(matches!(
            service.delete_account(1, "dave").await,
            Err(MediaError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_policy_value_is_not_saved() {
        let (service, _) = setup(FakeMediaServer::default()).await;

        assert!(service
            .set_default_policy(1, "EnableRemoteAccess", "maybe")
            .await
            .is_err());
        assert!(service.default_policy(1).await.enable_remote_access);

        let policy = service
            .set_default_policy(1, "EnableRemoteAccess", "false")
            .await
            .unwrap();
        assert!(!policy.enable_remote_access);
        assert!(!service.default_policy(1).await.enable_remote_access);
    }
}
