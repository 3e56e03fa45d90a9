use async_trait::async_trait;
use thiserror::Error;

use crate::core::media::ItemKind;

pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata request failed: {0}")]
    Http(String),
    #[error("metadata service returned HTTP {status}")]
    Status { status: u16 },
    #[error("metadata service is rate limiting us")]
    RateLimited,
    #[error("unexpected metadata response: {0}")]
    Decode(String),
}

/// Extra details about a title from the metadata service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaDetails {
    pub tmdb_id: u64,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
}

/// Looks titles up in an external movie/TV database.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// `Ok(None)` means the service had no match.
    async fn lookup(
        &self,
        api_key: &str,
        title: &str,
        year: Option<i32>,
        kind: ItemKind,
    ) -> Result<Option<MediaDetails>, MetadataError>;
}

pub fn poster_url(path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{POSTER_BASE_URL}{p}"))
}
