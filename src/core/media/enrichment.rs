use super::media_models::{details_url, play_url, truncate, MediaItem};
use crate::core::metadata::MetadataProvider;

/// Longest overview we put in an embed.
pub const OVERVIEW_LIMIT: usize = 1000;

/// A library item with everything needed to present it.
#[derive(Debug, Clone)]
pub struct ItemCard {
    pub item: MediaItem,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub tmdb_id: Option<u64>,
    pub details_url: String,
    pub play_url: String,
}

/// Build a card for `item`, preferring metadata-service text and artwork.
///
/// Lookup failures are logged and the server's own overview is used.
pub async fn describe(
    metadata: &dyn MetadataProvider,
    api_key: Option<&str>,
    base_url: &str,
    item: MediaItem,
) -> ItemCard {
    let details = match api_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => match metadata.lookup(key, &item.name, item.year, item.kind).await {
            Ok(details) => details,
            Err(err) => {
                tracing::warn!(item = %item.name, error = %err, "metadata lookup failed");
                None
            }
        },
        None => None,
    };

    let (tmdb_id, remote_overview, poster_url) = match details {
        Some(details) => (Some(details.tmdb_id), details.overview, details.poster_url),
        None => (None, None, None),
    };

    let overview = remote_overview
        .or_else(|| item.overview.clone())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .map(|text| truncate(&text, OVERVIEW_LIMIT));

    ItemCard {
        details_url: details_url(base_url, &item.id),
        play_url: play_url(base_url, &item.id),
        item,
        overview,
        poster_url,
        tmdb_id,
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::fake::FakeMetadata;
    use super::*;
    use crate::core::media::media_server::fake::item;
    use crate::core::metadata::MediaDetails;

    #[tokio::test]
    async fn prefers_metadata_service_details() {
        let metadata = FakeMetadata {
            details: Some(MediaDetails {
                tmdb_id: 603,
                overview: Some("From TMDb".into()),
                poster_url: Some("https://image.tmdb.org/t/p/w500/x.jpg".into()),
            }),
            ..FakeMetadata::default()
        };

        let card = describe(&metadata, Some("key"), "http://jf", item("1", "Matrix", None)).await;

        assert_eq!(card.overview.as_deref(), Some("From TMDb"));
        assert_eq!(card.tmdb_id, Some(603));
        assert!(card.poster_url.is_some());
        assert_eq!(card.details_url, "http://jf/web/index.html#!/details?id=1");
    }

    #[tokio::test]
    async fn falls_back_to_server_overview() {
        let failing = FakeMetadata {
            fail: true,
            ..FakeMetadata::default()
        };
        let card = describe(&failing, Some("key"), "http://jf", item("1", "Matrix", None)).await;
        assert_eq!(card.overview.as_deref(), Some("Matrix overview"));
        assert_eq!(card.poster_url, None);

        let unused = FakeMetadata::default();
        let card = describe(&unused, None, "http://jf", item("1", "Matrix", None)).await;
        assert_eq!(card.overview.as_deref(), Some("Matrix overview"));
        assert_eq!(unused.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn long_overviews_are_truncated() {
        let mut long = item("1", "Epic", None);
        long.overview = Some("x".repeat(1500));

        let card = describe(&FakeMetadata::default(), None, "http://jf", long).await;
        let overview = card.overview.unwrap();
        assert_eq!(overview.chars().count(), OVERVIEW_LIMIT);
        assert!(overview.ends_with("..."));
    }
}
