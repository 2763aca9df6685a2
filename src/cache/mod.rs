/// TTL-bounded fetch cache with per-key in-flight deduplication.
use crate::errors::{ApiError, ApiResult};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, warn};

/// Sentinel tokens for absent optional list parameters, so logically
/// identical queries always collide on the same key.
const ALL: &str = "all";
const ANY: &str = "any";

/// Canonical cache key for a list query.
pub fn list_key(category: Option<&str>, start: Option<&str>, end: Option<&str>) -> String {
    format!(
        "events-list:{}:{}:{}",
        category.filter(|s| !s.is_empty()).unwrap_or(ALL),
        start.filter(|s| !s.is_empty()).unwrap_or(ANY),
        end.filter(|s| !s.is_empty()).unwrap_or(ANY),
    )
}

/// Canonical cache key for a single-event fetch.
pub fn event_key(id: &str) -> String {
    format!("events-one:{id}")
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    stored_at: Instant,
}

struct CacheInner {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, broadcast::Sender<ApiResult<Value>>>>,
}

/// In-memory cache shielding the upstream feed from repeated queries.
///
/// An expired entry is treated as absent but stays in the map until the next
/// successful load for the same key overwrites it. Capacity is unbounded;
/// payload volume per key is bounded by the upstream request limit.
#[derive(Clone)]
pub struct FetchCache {
    inner: Arc<CacheInner>,
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                ttl,
                entries: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Look up a fresh entry. Expired entries are reported as absent.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.inner.entries.read().await;
        entries.get(key).and_then(|entry| {
            if entry.stored_at.elapsed() < self.inner.ttl {
                Some(entry.payload.clone())
            } else {
                None
            }
        })
    }

    /// Store a payload under the given key, superseding any stale entry.
    pub async fn put(&self, key: &str, payload: Value) {
        let mut entries = self.inner.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop an entry regardless of freshness.
    pub async fn invalidate(&self, key: &str) {
        let mut entries = self.inner.entries.write().await;
        entries.remove(key);
    }

    /// Resolve a key from the cache or load it from upstream.
    ///
    /// At most one loader runs per key at any time: the first caller on a
    /// miss starts the load, concurrent callers for the same key attach to
    /// the in-flight outcome and observe the same success or failure.
    /// Failures are surfaced to every waiter but never cached, so the next
    /// call after a failed load retries upstream.
    pub async fn fetch_or_load<F, Fut>(&self, key: &str, loader: F) -> ApiResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        if let Some(hit) = self.get(key).await {
            debug!(key, "cache hit");
            return Ok(hit);
        }

        let mut rx = {
            let mut in_flight = self.inner.in_flight.lock().await;
            // Re-check under the in-flight lock: a load may have completed
            // between the miss above and acquiring the lock.
            if let Some(hit) = self.get(key).await {
                return Ok(hit);
            }
            match in_flight.get(key) {
                Some(tx) => {
                    debug!(key, "joining in-flight fetch");
                    tx.subscribe()
                }
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    in_flight.insert(key.to_string(), tx);
                    drop(in_flight);
                    debug!(key, "cache miss, loading from upstream");
                    self.spawn_load(key.to_string(), loader());
                    rx
                }
            }
        };

        match rx.recv().await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApiError::UpstreamUnavailable(format!(
                "shared fetch for key {key} ended without a result"
            ))),
        }
    }

    /// Drive a load to completion on its own task, so the shared fetch
    /// survives the caller that initiated it walking away.
    fn spawn_load(&self, key: String, fut: impl Future<Output = ApiResult<Value>> + Send + 'static) {
        let cache = self.clone();
        tokio::spawn(async move {
            let result = fut.await;
            match &result {
                Ok(payload) => cache.put(&key, payload.clone()).await,
                Err(e) => warn!(key = %key, error = %e, "upstream load failed, cache left untouched"),
            }
            let tx = cache.inner.in_flight.lock().await.remove(&key);
            if let Some(tx) = tx {
                let _ = tx.send(result);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_loader(
        calls: Arc<AtomicUsize>,
        payload: Value,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = ApiResult<Value>> + Send>> {
        move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(payload)
            })
        }
    }

    fn failing_loader(
        calls: Arc<AtomicUsize>,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = ApiResult<Value>> + Send>> {
        move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(ApiError::UpstreamUnavailable("feed is down".to_string()))
            })
        }
    }

    #[tokio::test]
    async fn second_query_within_ttl_hits_cache() {
        let cache = FetchCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .fetch_or_load("k", counting_loader(calls.clone(), json!({"n": 1})))
            .await
            .unwrap();
        let second = cache
            .fetch_or_load("k", counting_loader(calls.clone(), json!({"n": 2})))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, json!({"n": 1}));
        assert_eq!(second, json!({"n": 1}));
    }

    #[tokio::test]
    async fn expired_entry_triggers_fresh_fetch() {
        let cache = FetchCache::new(Duration::from_millis(30));
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch_or_load("k", counting_loader(calls.clone(), json!(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let refreshed = cache
            .fetch_or_load("k", counting_loader(calls.clone(), json!(2)))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed, json!(2));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_upstream_fetch() {
        let cache = FetchCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            cache.fetch_or_load("k", counting_loader(calls.clone(), json!("x"))),
            cache.fetch_or_load("k", counting_loader(calls.clone(), json!("x"))),
            cache.fetch_or_load("k", counting_loader(calls.clone(), json!("x"))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), json!("x"));
        assert_eq!(b.unwrap(), json!("x"));
        assert_eq!(c.unwrap(), json!("x"));
    }

    #[tokio::test]
    async fn distinct_keys_do_not_share_fetches() {
        let cache = FetchCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.fetch_or_load("k1", counting_loader(calls.clone(), json!(1))),
            cache.fetch_or_load("k2", counting_loader(calls.clone(), json!(2))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.unwrap(), json!(1));
        assert_eq!(b.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn failure_is_shared_but_not_cached() {
        let cache = FetchCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.fetch_or_load("k", failing_loader(calls.clone())),
            cache.fetch_or_load("k", failing_loader(calls.clone())),
        );

        // One attempt shared by both waiters, identically.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(a, Err(ApiError::UpstreamUnavailable(_))));
        assert!(matches!(b, Err(ApiError::UpstreamUnavailable(_))));

        // The failure did not poison the key: the next call retries.
        let recovered = cache
            .fetch_or_load("k", counting_loader(calls.clone(), json!("ok")))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(recovered, json!("ok"));
    }

    #[test]
    fn list_key_uses_sentinels_for_absent_params() {
        assert_eq!(list_key(None, None, None), "events-list:all:any:any");
        assert_eq!(list_key(Some(""), None, Some("")), "events-list:all:any:any");
        assert_eq!(
            list_key(Some("wildfires"), Some("2025-01-01"), Some("2025-09-11")),
            "events-list:wildfires:2025-01-01:2025-09-11"
        );
    }

    #[test]
    fn event_key_is_namespaced() {
        assert_eq!(event_key("EONET_1234"), "events-one:EONET_1234");
    }
}
