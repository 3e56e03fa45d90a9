use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::media::{
    ItemKind, MediaConnector, MediaError, MediaFolder, MediaItem, MediaServer, MediaUser,
    ServerInfo, UserPolicy,
};
use crate::core::settings::MediaServerSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ITEM_FIELDS: &str =
    "Overview,Genres,Studios,PremiereDate,CommunityRating,OfficialRating,DateCreated,ProductionYear";
const ERROR_BODY_LIMIT: usize = 300;

/// Jellyfin REST client for one server.
pub struct JellyfinClient {
    client: Client,
    base_url: String,
}

impl JellyfinClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, MediaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Emby-Token",
            HeaderValue::from_str(api_key.trim()).map_err(|e| MediaError::Invalid(e.to_string()))?,
        );
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn checked(response: Response) -> Result<Response, MediaError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MediaError::Status {
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MediaError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| MediaError::Http(e.to_string()))?;

        Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|e| MediaError::Decode(e.to_string()))
    }

    async fn items(&self, query: &[(&str, String)]) -> Result<Vec<MediaItem>, MediaError> {
        let page: ApiItemPage = self.get_json("/Items", query).await?;
        Ok(page.items.into_iter().map(map_item).collect())
    }
}

#[async_trait]
impl MediaServer for JellyfinClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_users(&self) -> Result<Vec<MediaUser>, MediaError> {
        let users: Vec<ApiUser> = self.get_json("/Users", &[]).await?;
        Ok(users.into_iter().map(map_user).collect())
    }

    async fn search_items(&self, query: &str, limit: usize) -> Result<Vec<MediaItem>, MediaError> {
        self.items(&[
            ("searchTerm", query.to_string()),
            ("IncludeItemTypes", "Movie,Series".to_string()),
            ("Recursive", "true".to_string()),
            ("Limit", limit.to_string()),
            ("Fields", ITEM_FIELDS.to_string()),
        ])
        .await
    }

    async fn random_item(&self) -> Result<Option<MediaItem>, MediaError> {
        let items = self
            .items(&[
                ("IncludeItemTypes", "Movie,Series".to_string()),
                ("SortBy", "Random".to_string()),
                ("Limit", "1".to_string()),
                ("Recursive", "true".to_string()),
                ("Fields", ITEM_FIELDS.to_string()),
            ])
            .await?;
        Ok(items.into_iter().next())
    }

    async fn items_added_since(&self, since: DateTime<Utc>) -> Result<Vec<MediaItem>, MediaError> {
        self.items(&[
            ("IncludeItemTypes", "Movie,Series".to_string()),
            (
                "MinDateCreated",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("SortBy", "DateCreated,SortName".to_string()),
            ("SortOrder", "Descending".to_string()),
            ("Recursive", "true".to_string()),
            ("Fields", ITEM_FIELDS.to_string()),
        ])
        .await
    }

    async fn media_folders(&self) -> Result<Vec<MediaFolder>, MediaError> {
        let page: ApiItemPage = self.get_json("/Library/MediaFolders", &[]).await?;
        Ok(page
            .items
            .into_iter()
            .map(|item| MediaFolder {
                id: item.id,
                name: item.name.unwrap_or_else(|| "Unnamed library".to_string()),
            })
            .collect())
    }

    async fn item_count(&self, parent_id: &str) -> Result<u64, MediaError> {
        let page: ApiItemPage = self
            .get_json(
                "/Items",
                &[
                    ("ParentId", parent_id.to_string()),
                    ("Recursive", "true".to_string()),
                    ("Limit", "0".to_string()),
                ],
            )
            .await?;
        Ok(page.total_record_count.unwrap_or(0))
    }

    async fn server_info(&self) -> Result<ServerInfo, MediaError> {
        let info: ApiSystemInfo = self.get_json("/System/Info", &[]).await?;
        Ok(ServerInfo {
            server_name: info.server_name,
            version: info.version,
        })
    }

    async fn create_user(&self, name: &str, password: &str) -> Result<MediaUser, MediaError> {
        let response = self
            .client
            .post(self.url("/Users/New"))
            .json(&ApiNewUser { name, password })
            .send()
            .await
            .map_err(|e| MediaError::Http(e.to_string()))?;

        let user: ApiUser = Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|e| MediaError::Decode(e.to_string()))?;
        Ok(map_user(user))
    }

    async fn set_policy(&self, user_id: &str, policy: &UserPolicy) -> Result<(), MediaError> {
        let response = self
            .client
            .post(self.url(&format!("/Users/{user_id}/Policy")))
            .json(policy)
            .send()
            .await
            .map_err(|e| MediaError::Http(e.to_string()))?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), MediaError> {
        let response = self
            .client
            .delete(self.url(&format!("/Users/{user_id}")))
            .send()
            .await
            .map_err(|e| MediaError::Http(e.to_string()))?;
        Self::checked(response).await?;
        Ok(())
    }
}

/// Builds a `JellyfinClient` from a guild's media settings.
#[derive(Default)]
pub struct JellyfinConnector;

impl MediaConnector for JellyfinConnector {
    fn connect(&self, settings: &MediaServerSettings) -> Result<Arc<dyn MediaServer>, MediaError> {
        let url = settings.normalized_url().ok_or(MediaError::NotConfigured)?;
        let api_key = settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(MediaError::NotConfigured)?;
        Ok(Arc::new(JellyfinClient::new(&url, api_key)?))
    }
}

/// Jellyfin writes seven fractional digits and sometimes omits the offset;
/// "never" is reported as year 1.
fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
        .ok()?;
    (parsed.year() > 1).then_some(parsed)
}

fn map_user(api: ApiUser) -> MediaUser {
    let policy = api.policy.unwrap_or_default();
    MediaUser {
        id: api.id,
        name: api.name.unwrap_or_default(),
        last_activity: parse_date(api.last_activity_date.as_deref()),
        is_admin: policy.is_administrator,
        is_disabled: policy.is_disabled,
        policy,
    }
}

fn map_item(api: ApiItem) -> MediaItem {
    MediaItem {
        id: api.id,
        name: api.name.unwrap_or_else(|| "Untitled".to_string()),
        kind: ItemKind::from_jellyfin(api.item_type.as_deref().unwrap_or_default()),
        year: api.production_year,
        overview: api.overview.filter(|o| !o.trim().is_empty()),
        genres: api.genres.unwrap_or_default(),
        community_rating: api.community_rating,
        official_rating: api.official_rating,
        runtime_ticks: api.run_time_ticks,
        studios: api
            .studios
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| s.name)
            .collect(),
        premiere_date: parse_date(api.premiere_date.as_deref()),
        date_created: parse_date(api.date_created.as_deref()),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ApiNewUser<'a> {
    name: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiUser {
    id: String,
    name: Option<String>,
    last_activity_date: Option<String>,
    policy: Option<UserPolicy>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiItemPage {
    #[serde(default)]
    items: Vec<ApiItem>,
    total_record_count: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiItem {
    id: String,
    name: Option<String>,
    #[serde(rename = "Type")]
    item_type: Option<String>,
    production_year: Option<i32>,
    overview: Option<String>,
    genres: Option<Vec<String>>,
    community_rating: Option<f64>,
    official_rating: Option<String>,
    run_time_ticks: Option<i64>,
    studios: Option<Vec<ApiNamed>>,
    premiere_date: Option<String>,
    date_created: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiNamed {
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiSystemInfo {
    server_name: Option<String>,
    version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_jellyfin_dates() {
        assert_eq!(
            parse_date(Some("2024-03-01T10:20:30.1234567Z")),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap() + chrono::Duration::nanoseconds(123_456_700))
        );
        assert_eq!(
            parse_date(Some("2024-03-01T10:20:30")),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap())
        );
        assert_eq!(parse_date(Some("0001-01-01T00:00:00.0000000Z")), None);
        assert_eq!(parse_date(Some("garbage")), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn maps_users_with_policy() {
        let raw = r#"[{
            "Id": "abc",
            "Name": "alice",
            "LastActivityDate": "2024-01-02T03:04:05Z",
            "Policy": { "IsAdministrator": true, "IsDisabled": false, "AuthenticationProviderId": "x" }
        }, {
            "Id": "def",
            "Name": "bob"
        }]"#;
        let users: Vec<MediaUser> = serde_json::from_str::<Vec<ApiUser>>(raw)
            .unwrap()
            .into_iter()
            .map(map_user)
            .collect();

        assert!(users[0].is_admin);
        assert!(users[0].last_activity.is_some());
        assert_eq!(
            users[0].policy.extra.get("AuthenticationProviderId"),
            Some(&serde_json::json!("x"))
        );
        assert!(!users[1].is_admin);
        assert_eq!(users[1].last_activity, None);
    }

    #[test]
    fn maps_items() {
        let raw = r#"{
            "Items": [{
                "Id": "i1",
                "Name": "Heat",
                "Type": "Movie",
                "ProductionYear": 1995,
                "Overview": "",
                "Genres": ["Crime"],
                "RunTimeTicks": 102000000000,
                "Studios": [{ "Name": "Warner" }, {}],
                "DateCreated": "2024-05-05T00:00:00.0000000Z"
            }],
            "TotalRecordCount": 1
        }"#;
        let page: ApiItemPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.total_record_count, Some(1));

        let item = map_item(page.items.into_iter().next().unwrap());
        assert_eq!(item.kind, ItemKind::Movie);
        assert_eq!(item.year, Some(1995));
        assert_eq!(item.overview, None);
        assert_eq!(item.studios, vec!["Warner".to_string()]);
        assert!(item.date_created.is_some());
    }

    #[test]
    fn connector_requires_configuration() {
        let settings = MediaServerSettings {
            url: Some("http://media.test/".into()),
            api_key: None,
        };
        assert!(matches!(
            JellyfinConnector.connect(&settings),
            Err(MediaError::NotConfigured)
        ));

        let settings = MediaServerSettings {
            url: Some("http://media.test/".into()),
            api_key: Some("key".into()),
        };
        let server = JellyfinConnector.connect(&settings).unwrap();
        assert_eq!(server.base_url(), "http://media.test");
    }
}
