/**
 * Configuration constants for the background resource cache
 */
use std::time::Duration;

/// Minimum seconds between background refreshes; lower values would hammer the
/// orchestrator.
pub const MIN_REFRESH_INTERVAL_SECONDS: u64 = 30;

/// Minimum per-page fetch size during a refresh.
pub const MIN_PAGE_FETCH: usize = 100;

/// Page size requested during a refresh, capped by `max_page_fetch`.
pub const REFRESH_PAGE_SIZE: usize = 500;

/// Poll interval while waiting for a fetch factory to be wired.
pub const WIRING_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Grace period for cooperative shutdown before the refresh task is aborted.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Effective cache settings after floor clamping.
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub refresh_interval: Duration,
    pub max_page_fetch: usize,
}

impl CacheSettings {
    /// Clamp the requested interval and per-page cap to their floors.
    #[must_use]
    pub const fn new(refresh_interval_secs: u64, max_page_fetch: usize) -> Self {
        let secs = if refresh_interval_secs < MIN_REFRESH_INTERVAL_SECONDS {
            MIN_REFRESH_INTERVAL_SECONDS
        } else {
            refresh_interval_secs
        };
        let max = if max_page_fetch < MIN_PAGE_FETCH {
            MIN_PAGE_FETCH
        } else {
            max_page_fetch
        };
        Self {
            refresh_interval: Duration::from_secs(secs),
            max_page_fetch: max,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::new(300, 5000)
    }
}

/// Validate configuration constants at compile time
const _: () = {
    assert!(MIN_REFRESH_INTERVAL_SECONDS > 0, "refresh floor must be positive");
    assert!(MIN_PAGE_FETCH > 0, "page fetch floor must be positive");
    assert!(REFRESH_PAGE_SIZE > 0, "refresh page size must be positive");
};
