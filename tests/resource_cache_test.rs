use async_trait::async_trait;
use fabric_proxy::error::{Error, Result};
use fabric_proxy::fabric::cache::{CacheSettings, ResourceCache};
use fabric_proxy::fabric::fetch::{PageQuery, TopologyFetch};
use fabric_proxy::fabric::{Record, ResourceKind};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Serves a fixed dataset per kind, slicing pages naturally from it, and logs
/// every call. Flipping `fail` simulates an upstream outage.
#[derive(Default)]
struct ScriptedFetch {
    data: Mutex<HashMap<ResourceKind, Vec<Record>>>,
    calls: Mutex<Vec<(ResourceKind, usize, usize)>>,
    credentials: Mutex<Vec<Option<String>>>,
    fail: AtomicBool,
}

impl ScriptedFetch {
    fn set(&self, kind: ResourceKind, records: Vec<Record>) {
        self.data.lock().unwrap().insert(kind, records);
    }

    fn calls_for(&self, kind: ResourceKind) -> Vec<(usize, usize)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, limit, offset)| (*limit, *offset))
            .collect()
    }
}

#[async_trait]
impl TopologyFetch for ScriptedFetch {
    async fn fetch_page(&self, kind: ResourceKind, query: &PageQuery) -> Result<Vec<Record>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Upstream("synthetic outage".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((kind, query.limit, query.offset));
        if kind == ResourceKind::Sites {
            self.credentials.lock().unwrap().push(query.credential.clone());
        }
        let items = self
            .data
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        Ok(items
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

fn records(prefix: &str, count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            json!({"name": format!("{prefix}-{i}")})
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect()
}

fn tagged_records(cycle: u64, count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            json!({"name": format!("r-{i}"), "cycle": cycle})
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect()
}

fn new_cache(settings: CacheSettings) -> Arc<ResourceCache> {
    Arc::new(ResourceCache::new(settings))
}

async fn wire(cache: &Arc<ResourceCache>, fetch: &Arc<ScriptedFetch>) {
    let fetch = fetch.clone();
    cache
        .wire_fetch_factory(move || Ok(fetch.clone() as Arc<dyn TopologyFetch>))
        .await;
}

#[tokio::test]
async fn test_paging_drains_until_short_page() {
    let fetch = Arc::new(ScriptedFetch::default());
    fetch.set(ResourceKind::Sites, records("site", 1240));

    let cache = new_cache(CacheSettings::new(300, 5000));
    wire(&cache, &fetch).await;
    cache.refresh_once().await.unwrap();

    let snap = cache.snapshot().await;
    assert_eq!(snap.sites.len(), 1240);
    // Page size is min(max_page_fetch, 500) = 500; short third page stops it.
    assert_eq!(
        fetch.calls_for(ResourceKind::Sites),
        vec![(500, 0), (500, 500), (500, 1000)]
    );
}

#[tokio::test]
async fn test_empty_first_page_stops_after_one_call() {
    let fetch = Arc::new(ScriptedFetch::default());
    let cache = new_cache(CacheSettings::default());
    wire(&cache, &fetch).await;
    cache.refresh_once().await.unwrap();

    for kind in ResourceKind::ALL {
        assert_eq!(fetch.calls_for(kind).len(), 1, "kind={kind}");
    }
    let snap = cache.snapshot().await;
    assert!(!snap.has_data());
    assert!(snap.is_captured());
}

#[tokio::test]
async fn test_page_size_respects_max_fetch_floor() {
    let fetch = Arc::new(ScriptedFetch::default());
    fetch.set(ResourceKind::Links, records("link", 250));

    // Requested cap of 10 clamps up to the floor of 100.
    let cache = new_cache(CacheSettings::new(300, 10));
    wire(&cache, &fetch).await;
    cache.refresh_once().await.unwrap();

    assert_eq!(
        fetch.calls_for(ResourceKind::Links),
        vec![(100, 0), (100, 100), (100, 200)]
    );
    assert_eq!(cache.snapshot().await.links.len(), 250);
}

#[tokio::test]
async fn test_refresh_is_noop_without_factory() {
    let cache = Arc::new(ResourceCache::new(CacheSettings::default()));
    cache.refresh_once().await.unwrap();
    assert!(!cache.snapshot().await.is_captured());
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let fetch = Arc::new(ScriptedFetch::default());
    fetch.set(ResourceKind::Hosts, records("host", 3));

    let cache = new_cache(CacheSettings::default());
    wire(&cache, &fetch).await;
    cache.refresh_once().await.unwrap();
    let before = cache.snapshot().await;

    fetch.fail.store(true, Ordering::SeqCst);
    assert!(cache.refresh_once().await.is_err());

    let after = cache.snapshot().await;
    assert_eq!(after.captured_at, before.captured_at);
    assert_eq!(after.hosts, before.hosts);

    // Next successful cycle publishes again.
    fetch.fail.store(false, Ordering::SeqCst);
    cache.refresh_once().await.unwrap();
    assert!(cache.snapshot().await.captured_at > before.captured_at);
}

#[tokio::test]
async fn test_successive_snapshots_have_distinct_capture_times() {
    let fetch = Arc::new(ScriptedFetch::default());
    let cache = new_cache(CacheSettings::default());
    wire(&cache, &fetch).await;

    cache.refresh_once().await.unwrap();
    let first = cache.snapshot().await;
    cache.refresh_once().await.unwrap();
    let second = cache.snapshot().await;
    assert!(second.captured_at > first.captured_at);
}

#[tokio::test]
async fn test_start_stop_idempotent() {
    let fetch = Arc::new(ScriptedFetch::default());
    let cache = new_cache(CacheSettings::default());
    wire(&cache, &fetch).await;

    cache.start().await;
    cache.start().await;
    assert!(cache.is_running().await);

    cache.stop().await;
    assert!(!cache.is_running().await);
    cache.stop().await;
    assert!(!cache.is_running().await);
}

#[tokio::test]
async fn test_stop_is_responsive_during_interval_wait() {
    let fetch = Arc::new(ScriptedFetch::default());
    let cache = new_cache(CacheSettings::new(300, 5000));
    wire(&cache, &fetch).await;
    cache.start().await;

    // Let the initial refresh complete and the loop settle into its wait.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.has_data().await || cache.snapshot().await.is_captured());

    let started = Instant::now();
    cache.stop().await;
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "stop took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_stop_before_wiring_is_responsive() {
    let cache = Arc::new(ResourceCache::new(CacheSettings::default()));
    cache.start().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    cache.stop().await;
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_loop_survives_refresh_failures() {
    let fetch = Arc::new(ScriptedFetch::default());
    fetch.fail.store(true, Ordering::SeqCst);

    let cache = new_cache(CacheSettings::default());
    wire(&cache, &fetch).await;
    cache.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The failed initial refresh must not kill the task.
    assert!(cache.is_running().await);
    assert!(!cache.snapshot().await.is_captured());
    cache.stop().await;
}

#[tokio::test]
async fn test_loop_waits_for_late_wiring() {
    let fetch = Arc::new(ScriptedFetch::default());
    fetch.set(ResourceKind::Sites, records("site", 2));

    let cache = Arc::new(ResourceCache::new(CacheSettings::default()));
    cache.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!cache.snapshot().await.is_captured());

    wire(&cache, &fetch).await;
    // The loop polls wiring at 200ms; give it time to notice and refresh.
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cache.has_data().await && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(cache.has_data().await);
    cache.stop().await;
}

#[tokio::test]
async fn test_refresh_uses_last_noted_credential() {
    let fetch = Arc::new(ScriptedFetch::default());
    let cache = new_cache(CacheSettings::default());
    wire(&cache, &fetch).await;

    cache.refresh_once().await.unwrap();
    cache.note_credential(Some("")).await;
    cache.note_credential(None).await;
    cache.refresh_once().await.unwrap();
    cache.note_credential(Some("token-abc")).await;
    cache.refresh_once().await.unwrap();

    let seen = fetch.credentials.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![None, None, Some("token-abc".to_string())],
        "empty and absent tokens must be ignored"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_torn_snapshot() {
    let fetch = Arc::new(ScriptedFetch::default());
    let cache = new_cache(CacheSettings::default());
    wire(&cache, &fetch).await;

    let writer = {
        let fetch = fetch.clone();
        let cache = cache.clone();
        tokio::spawn(async move {
            for cycle in 0..50u64 {
                for kind in ResourceKind::ALL {
                    fetch.set(kind, tagged_records(cycle, 5));
                }
                cache.refresh_once().await.unwrap();
            }
        })
    };

    let reader = {
        let cache = cache.clone();
        tokio::spawn(async move {
            loop {
                let snap = cache.snapshot().await;
                if snap.is_captured() {
                    let cycles: Vec<u64> = ResourceKind::ALL
                        .iter()
                        .flat_map(|k| snap.collection(*k))
                        .map(|r| r["cycle"].as_u64().unwrap())
                        .collect();
                    assert!(
                        cycles.windows(2).all(|w| w[0] == w[1]),
                        "mixed refresh cycles in one snapshot: {cycles:?}"
                    );
                    if cycles.first() == Some(&49) {
                        break;
                    }
                }
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_credential_updates_do_not_block_readers() {
    let fetch = Arc::new(ScriptedFetch::default());
    fetch.set(ResourceKind::Sites, records("site", 1));
    let cache = new_cache(CacheSettings::default());
    wire(&cache, &fetch).await;
    cache.refresh_once().await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..32 {
        let cache = cache.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..100 {
                if i % 2 == 0 {
                    cache.note_credential(Some("tok")).await;
                } else {
                    assert!(cache.snapshot().await.has_data());
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
}
