// Media-server features.
// - `media_models.rs` / `media_server.rs`: domain types and the server port.
// - `inactivity.rs`: idle-account classification and cleanup.
// - `catalog.rs`, `new_content.rs`, `library_stats.rs`: library browsing and announcements.
// - `provisioning.rs`: account creation for guild admins.

pub mod catalog;
pub mod enrichment;
pub mod inactivity;
pub mod library_stats;
pub mod media_models;
pub mod media_server;
pub mod new_content;
pub mod provisioning;

pub use catalog::{CatalogService, Recommendation, SearchResults, SEARCH_LIMIT};
pub use enrichment::ItemCard;
pub use inactivity::{
    ActionKind, InactiveUser, InactivityReport, InactivityService, InactivityStatus, Verdict,
};
pub use library_stats::{LibraryStatsService, StatsTarget};
pub use media_models::{
    details_url, format_runtime, play_url, truncate, ItemKind, LibraryCount, MediaError,
    MediaFolder, MediaItem, MediaUser, ServerInfo, UserPolicy,
};
pub use media_server::{MediaConnector, MediaServer};
pub use new_content::{NewContentCheck, NewContentService};
pub use provisioning::{CreatedAccount, ProvisioningService};
