//! Self-refreshing snapshot cache for advertised topology resources.
//!
//! One long-lived background task drains the four collections from the
//! orchestrator on a fixed cadence and publishes each capture as a whole new
//! [`ResourceSnapshot`]. Readers clone the current `Arc` and never observe a
//! partially updated snapshot; a failed refresh leaves the previous snapshot
//! in place.

use super::config::{CacheSettings, REFRESH_PAGE_SIZE, STOP_GRACE_PERIOD, WIRING_POLL_INTERVAL};
use super::snapshot::ResourceSnapshot;
use crate::error::Result;
use crate::fabric::fetch::{PageQuery, TopologyFetch};
use crate::fabric::{Record, ResourceKind};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Zero-argument constructor for a fresh upstream handle; handles are not
/// reused across refreshes. A construction failure is a failed refresh.
type FetchFactory = Arc<dyn Fn() -> Result<Arc<dyn TopologyFetch>> + Send + Sync>;

struct RefreshTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct ResourceCache {
    settings: CacheSettings,
    /// Current snapshot; the write lock is held only for the pointer swap.
    snap: RwLock<Arc<ResourceSnapshot>>,
    /// Last known-good credential, guarded independently of the snapshot lock
    /// so refresh publication never stalls credential updates.
    last_good_token: Mutex<Option<String>>,
    fetch_factory: RwLock<Option<FetchFactory>>,
    task: Mutex<Option<RefreshTask>>,
}

impl ResourceCache {
    #[must_use]
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            snap: RwLock::new(Arc::new(ResourceSnapshot::empty())),
            last_good_token: Mutex::new(None),
            fetch_factory: RwLock::new(None),
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Supply the upstream client factory. The refresh loop idles until this
    /// is called, so startup ordering between cache and wiring is not
    /// critical — but no refresh ever happens without it.
    pub async fn wire_fetch_factory<F>(&self, factory: F)
    where
        F: Fn() -> Result<Arc<dyn TopologyFetch>> + Send + Sync + 'static,
    {
        *self.fetch_factory.write().await = Some(Arc::new(factory));
    }

    /// Spawn the background refresh loop. Idempotent.
    pub async fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            debug!("refresh loop already running, ignoring start");
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::periodic_refresh_loop(self.clone(), cancel.clone()));
        *task = Some(RefreshTask { cancel, handle });
        info!(
            interval_secs = self.settings.refresh_interval.as_secs(),
            max_page_fetch = self.settings.max_page_fetch,
            "background resource cache started"
        );
    }

    /// Signal the loop to exit and wait up to the grace period; abort it if
    /// it does not finish in time. Idempotent, never hangs the caller.
    pub async fn stop(&self) {
        let Some(RefreshTask { cancel, mut handle }) = self.task.lock().await.take() else {
            return;
        };
        cancel.cancel();
        if timeout(STOP_GRACE_PERIOD, &mut handle).await.is_err() {
            warn!("refresh loop did not stop within grace period, aborting");
            handle.abort();
        }
        info!("background resource cache stopped");
    }

    #[must_use]
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// Record the most recently seen valid credential for use by subsequent
    /// refreshes. Empty or absent tokens are ignored.
    pub async fn note_credential(&self, token: Option<&str>) {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return;
        };
        *self.last_good_token.lock().await = Some(token.to_string());
    }

    /// Current snapshot. Readers only clone the `Arc`; they never block on an
    /// in-flight refresh.
    pub async fn snapshot(&self) -> Arc<ResourceSnapshot> {
        self.snap.read().await.clone()
    }

    /// True iff any of the four collections is non-empty. This reports false
    /// both before the first refresh and after a refresh that found nothing;
    /// see `ResourceSnapshot::is_captured` for the distinction.
    pub async fn has_data(&self) -> bool {
        self.snapshot().await.has_data()
    }

    /// Pull all four collections and publish a new snapshot.
    ///
    /// No-op when no fetch factory is wired. On any fetch error nothing is
    /// published and the previous snapshot stays current.
    ///
    /// # Errors
    ///
    /// Propagates upstream fetch failures; the background loop discards them.
    pub async fn refresh_once(&self) -> Result<()> {
        let Some(factory) = self.fetch_factory.read().await.clone() else {
            return Ok(());
        };
        // Fresh handle per refresh; no connection state leaks across cycles.
        let client = factory()?;
        let credential = self.last_good_token.lock().await.clone();

        let sites = self
            .drain_pages(client.as_ref(), ResourceKind::Sites, credential.as_deref())
            .await?;
        let hosts = self
            .drain_pages(client.as_ref(), ResourceKind::Hosts, credential.as_deref())
            .await?;
        let facility_ports = self
            .drain_pages(client.as_ref(), ResourceKind::FacilityPorts, credential.as_deref())
            .await?;
        let links = self
            .drain_pages(client.as_ref(), ResourceKind::Links, credential.as_deref())
            .await?;

        let snapshot = Arc::new(ResourceSnapshot::new(sites, hosts, facility_ports, links));
        info!(
            sites = snapshot.sites.len(),
            hosts = snapshot.hosts.len(),
            facility_ports = snapshot.facility_ports.len(),
            links = snapshot.links.len(),
            "published new resource snapshot"
        );

        *self.snap.write().await = snapshot;
        Ok(())
    }

    /// Page through one collection until a short or empty page signals
    /// end-of-data. Offsets advance by the page size: 0, L, 2L, ...
    async fn drain_pages(
        &self,
        client: &dyn TopologyFetch,
        kind: ResourceKind,
        credential: Option<&str>,
    ) -> Result<Vec<Record>> {
        let limit = self.settings.max_page_fetch.min(REFRESH_PAGE_SIZE);
        let mut out = Vec::new();
        let mut offset = 0;
        loop {
            debug!(%kind, offset, limit, "refresh fetching page");
            let query =
                PageQuery::page(limit, offset).with_credential(credential.map(str::to_string));
            let page = client.fetch_page(kind, &query).await?;
            if page.is_empty() {
                break;
            }
            let short_page = page.len() < limit;
            out.extend(page);
            if short_page {
                break;
            }
            offset += limit;
        }
        Ok(out)
    }

    async fn periodic_refresh_loop(cache: Arc<Self>, cancel: CancellationToken) {
        // Staged startup: idle until a fetch factory is wired, staying
        // responsive to stop() the whole time.
        while cache.fetch_factory.read().await.is_none() {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = sleep(WIRING_POLL_INTERVAL) => {}
            }
        }

        // Immediate first attempt so consumers see data as soon as possible.
        if let Err(err) = cache.refresh_once().await {
            warn!(error = %err, "initial cache refresh failed");
        }

        while !cancel.is_cancelled() {
            if let Err(err) = cache.refresh_once().await {
                warn!(error = %err, "cache refresh failed, keeping previous snapshot");
            }
            tokio::select! {
                () = cancel.cancelled() => {}
                () = sleep(cache.settings.refresh_interval) => {}
            }
        }
        debug!("refresh loop exiting");
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("ResourceCache")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
