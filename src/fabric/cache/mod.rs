pub mod config;
pub mod resource_cache;
pub mod snapshot;

pub use config::{CacheSettings, MIN_PAGE_FETCH, MIN_REFRESH_INTERVAL_SECONDS};
pub use resource_cache::ResourceCache;
pub use snapshot::ResourceSnapshot;
