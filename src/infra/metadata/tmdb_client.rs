use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::core::media::ItemKind;
use crate::core::metadata::{poster_url, MediaDetails, MetadataError, MetadataProvider};
use crate::core::scheduler::{retry, Retry, RetryPolicy};

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TMDb v3 client: search by title, then fetch the full record.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl TmdbClient {
    pub fn new() -> Result<Self, MetadataError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MetadataError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: TMDB_BASE_URL.to_string(),
            policy: RetryPolicy::default(),
        })
    }

    fn media_type(kind: ItemKind) -> &'static str {
        match kind {
            ItemKind::Series => "tv",
            _ => "movie",
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, Retry<MetadataError>> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Retry::Transient(MetadataError::Http(e.to_string())))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| Retry::Abort(MetadataError::Decode(e.to_string()))),
            StatusCode::TOO_MANY_REQUESTS => Err(Retry::Throttled(MetadataError::RateLimited)),
            status if status.is_server_error() => Err(Retry::Transient(MetadataError::Status {
                status: status.as_u16(),
            })),
            status => Err(Retry::Abort(MetadataError::Status {
                status: status.as_u16(),
            })),
        }
    }

    async fn search(
        &self,
        api_key: &str,
        title: &str,
        year: Option<i32>,
        kind: ItemKind,
    ) -> Result<Option<ApiSearchResult>, MetadataError> {
        let url = format!("{}/search/{}", self.base_url, Self::media_type(kind));
        let mut query = vec![("api_key", api_key.to_string()), ("query", title.to_string())];
        if let Some(year) = year {
            let key = match kind {
                ItemKind::Series => "first_air_date_year",
                _ => "year",
            };
            query.push((key, year.to_string()));
        }

        let page: ApiSearchPage = retry(&self.policy, "tmdb search", |_| self.get_json(&url, &query)).await?;
        Ok(page.results.into_iter().next())
    }

    async fn details(&self, api_key: &str, id: u64, kind: ItemKind) -> Result<ApiDetails, MetadataError> {
        let url = format!("{}/{}/{}", self.base_url, Self::media_type(kind), id);
        let query = [("api_key", api_key.to_string())];
        retry(&self.policy, "tmdb details", |_| self.get_json(&url, &query)).await
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn lookup(
        &self,
        api_key: &str,
        title: &str,
        year: Option<i32>,
        kind: ItemKind,
    ) -> Result<Option<MediaDetails>, MetadataError> {
        let Some(hit) = self.search(api_key, title, year, kind).await? else {
            tracing::debug!(title, "no TMDb match");
            return Ok(None);
        };

        let details = match self.details(api_key, hit.id, kind).await {
            Ok(details) => merge(hit, Some(details)),
            Err(err) => {
                tracing::warn!(title, tmdb_id = hit.id, error = %err, "TMDb details failed, using search result");
                merge(hit, None)
            }
        };
        Ok(Some(details))
    }
}

/// Prefer the full record, falling back to what the search returned.
fn merge(hit: ApiSearchResult, details: Option<ApiDetails>) -> MediaDetails {
    let (overview, poster_path) = match details {
        Some(details) => (
            details.overview.filter(|o| !o.trim().is_empty()).or(hit.overview),
            details.poster_path.or(hit.poster_path),
        ),
        None => (hit.overview, hit.poster_path),
    };

    MediaDetails {
        tmdb_id: hit.id,
        overview: overview.filter(|o| !o.trim().is_empty()),
        poster_url: poster_url(poster_path.as_deref()),
    }
}

#[derive(Deserialize)]
struct ApiSearchPage {
    #[serde(default)]
    results: Vec<ApiSearchResult>,
}

#[derive(Deserialize)]
struct ApiSearchResult {
    id: u64,
    overview: Option<String>,
    poster_path: Option<String>,
}

#[derive(Deserialize)]
struct ApiDetails {
    overview: Option<String>,
    poster_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit() -> ApiSearchResult {
        ApiSearchResult {
            id: 949,
            overview: Some("short".into()),
            poster_path: Some("/search.jpg".into()),
        }
    }

    #[test]
    fn details_win_over_search_results() {
        let merged = merge(
            hit(),
            Some(ApiDetails {
                overview: Some("full overview".into()),
                poster_path: None,
            }),
        );
        assert_eq!(merged.tmdb_id, 949);
        assert_eq!(merged.overview.as_deref(), Some("full overview"));
        assert_eq!(
            merged.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/search.jpg")
        );
    }

    #[test]
    fn blank_details_fall_back() {
        let merged = merge(
            hit(),
            Some(ApiDetails {
                overview: Some("  ".into()),
                poster_path: Some("/full.jpg".into()),
            }),
        );
        assert_eq!(merged.overview.as_deref(), Some("short"));
        assert!(merged.poster_url.unwrap().ends_with("/full.jpg"));

        assert_eq!(merge(hit(), None).overview.as_deref(), Some("short"));
    }

    #[test]
    fn search_page_tolerates_missing_results() {
        let page: ApiSearchPage = serde_json::from_str(r#"{"page":1}"#).unwrap();
        assert!(page.results.is_empty());

        let page: ApiSearchPage =
            serde_json::from_str(r#"{"results":[{"id":1,"title":"Heat","poster_path":null}]}"#).unwrap();
        assert_eq!(page.results[0].id, 1);
    }

    #[test]
    fn series_use_tv_endpoints() {
        assert_eq!(TmdbClient::media_type(ItemKind::Series), "tv");
        assert_eq!(TmdbClient::media_type(ItemKind::Movie), "movie");
    }
}
