pub mod metadata_provider;

pub use metadata_provider::{poster_url, MediaDetails, MetadataError, MetadataProvider};
