//! Remote data cache over backend GET endpoints.
//!
//! One `ResourceCache` instance is created per session and shared by `Arc`
//! with every listing and wizard that needs it. Entries are keyed by request
//! path. Concurrent loads of the same key share a single in-flight request,
//! and `invalidate` forces a fresh fetch whose result is broadcast to every
//! subscriber of that key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ApiError;

/// Source of remote JSON for a cache key
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Value, ApiError>;
}

/// Raw state of one cache key, as broadcast to subscribers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheEntry {
    pub data: Option<Value>,
    pub error: Option<ApiError>,
    pub is_loading: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Typed view of a cache key
#[derive(Debug, Clone, PartialEq)]
pub struct Resource<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub is_loading: bool,
}

impl<T> Resource<T> {
    /// True until the first response (or error) arrives
    pub fn is_pending(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;
type Slots = Arc<Mutex<HashMap<String, Slot>>>;

enum FetchPlan {
    Cached(Value),
    Join(SharedFetch),
}

struct Slot {
    tx: watch::Sender<CacheEntry>,
    in_flight: Option<SharedFetch>,
    /// Bumped for every fetch started; only the newest fetch may write
    generation: u64,
}

impl Slot {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(CacheEntry::default());
        Self {
            tx,
            in_flight: None,
            generation: 0,
        }
    }
}

pub struct ResourceCache {
    fetcher: Arc<dyn Fetcher>,
    slots: Slots,
}

impl ResourceCache {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        lock_slots(&self.slots)
    }

    /// Current raw state of `key` (default entry if never loaded)
    pub fn entry(&self, key: &str) -> CacheEntry {
        self.slots()
            .get(key)
            .map(|slot| slot.tx.borrow().clone())
            .unwrap_or_default()
    }

    /// Typed snapshot of `key`. A body that does not decode as `T` is
    /// reported through `error`.
    pub fn resource<T: DeserializeOwned>(&self, key: &str) -> Resource<T> {
        let entry = self.entry(key);
        let mut error = entry.error;
        let data = match entry.data {
            Some(value) => match serde_json::from_value(value) {
                Ok(data) => Some(data),
                Err(e) => {
                    error = Some(ApiError::decode(format!("{key}: {e}")));
                    None
                }
            },
            None => None,
        };
        Resource {
            data,
            error,
            is_loading: entry.is_loading,
        }
    }

    /// Receive every state change of `key`
    pub fn subscribe(&self, key: &str) -> watch::Receiver<CacheEntry> {
        self.slots()
            .entry(key.to_string())
            .or_insert_with(Slot::new)
            .tx
            .subscribe()
    }

    /// Load `key` if it has no data yet, sharing any request already in flight
    pub async fn load(&self, key: &str) -> Result<Value, ApiError> {
        self.fetch(key, false).await
    }

    /// Typed `load`
    pub async fn load_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ApiError> {
        let value = self.load(key).await?;
        serde_json::from_value(value).map_err(|e| ApiError::decode(format!("{key}: {e}")))
    }

    /// Force a re-fetch of `key` and notify all subscribers
    pub async fn invalidate(&self, key: &str) -> Result<Value, ApiError> {
        debug!(key, "invalidating cache key");
        self.fetch(key, true).await
    }

    async fn fetch(&self, key: &str, force: bool) -> Result<Value, ApiError> {
        let plan = {
            let mut slots = self.slots();
            let slot = slots.entry(key.to_string()).or_insert_with(Slot::new);

            let (joinable, cached) = if force {
                (None, None)
            } else {
                (slot.in_flight.clone(), slot.tx.borrow().data.clone())
            };

            if let Some(in_flight) = joinable {
                debug!(key, "joining in-flight request");
                FetchPlan::Join(in_flight)
            } else if let Some(data) = cached {
                FetchPlan::Cached(data)
            } else {
                slot.generation += 1;
                let future = self.start_fetch(key, slot.generation);
                slot.in_flight = Some(future.clone());
                slot.tx.send_modify(|entry| entry.is_loading = true);
                FetchPlan::Join(future)
            }
        };

        match plan {
            FetchPlan::Cached(data) => Ok(data),
            FetchPlan::Join(future) => future.await,
        }
    }

    /// Build the shared request for `key`. The entry is updated by whichever
    /// caller drives the request to completion, so dropping the caller that
    /// started it cannot leave the entry loading.
    fn start_fetch(&self, key: &str, generation: u64) -> SharedFetch {
        let fetcher = Arc::clone(&self.fetcher);
        // weak: the slot itself holds this future while it is in flight
        let slots = Arc::downgrade(&self.slots);
        let key = key.to_string();
        async move {
            let result = fetcher.fetch(&key).await;
            store_result(&slots, &key, generation, &result);
            result
        }
        .boxed()
        .shared()
    }

    /// Re-fetch `key` every `interval` until `cancel` fires
    pub fn spawn_revalidation(
        self: &Arc<Self>,
        key: impl Into<String>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let key = key.into();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!(key = %key, "revalidation stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        // errors are recorded on the entry
                        let _ = cache.invalidate(&key).await;
                    }
                }
            }
        })
    }
}

fn lock_slots(slots: &Slots) -> MutexGuard<'_, HashMap<String, Slot>> {
    // A poisoned lock only means another task panicked mid-update;
    // the map itself stays usable.
    slots
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn store_result(
    slots: &Weak<Mutex<HashMap<String, Slot>>>,
    key: &str,
    generation: u64,
    result: &Result<Value, ApiError>,
) {
    let Some(slots) = slots.upgrade() else {
        return;
    };
    let mut slots = lock_slots(&slots);
    let Some(slot) = slots.get_mut(key) else {
        return;
    };
    // A newer fetch owns the slot now; its result will land instead
    if slot.generation != generation {
        return;
    }
    slot.in_flight = None;
    slot.tx.send_modify(|entry| {
        entry.is_loading = false;
        match result {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.error = None;
                entry.fetched_at = Some(Utc::now());
            }
            Err(err) => {
                warn!(key, error = %err, "cache fetch failed");
                // keep stale data visible alongside the error
                entry.error = Some(err.clone());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts fetches and answers with the running count
    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingFetcher {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, key: &str) -> Result<Value, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(ApiError::http(500, format!("{key} failed")));
            }
            Ok(serde_json::json!([{ "id": n, "name": key }]))
        }
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_request() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(50)));
        let cache = ResourceCache::new(fetcher.clone());

        let (a, b, c) = tokio::join!(cache.load("/x"), cache.load("/x"), cache.load("/x"));

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), b.clone().unwrap());
        assert_eq!(b.unwrap(), c.unwrap());
    }

    #[tokio::test]
    async fn test_load_uses_cached_data() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
        let cache = ResourceCache::new(fetcher.clone());

        cache.load("/x").await.unwrap();
        cache.load("/x").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_refetches_and_notifies() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
        let cache = ResourceCache::new(fetcher.clone());

        let mut rx = cache.subscribe("/x");
        cache.load("/x").await.unwrap();
        rx.borrow_and_update();

        cache.invalidate("/x").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

        let entry = rx.borrow_and_update().clone();
        assert_eq!(entry.data.unwrap()[0]["id"], 2);
        assert!(!entry.is_loading);
    }

    #[tokio::test]
    async fn test_typed_resource() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Row {
            id: i64,
            name: String,
        }

        let cache = ResourceCache::new(Arc::new(CountingFetcher::new(Duration::ZERO)));
        let pending: Resource<Vec<Row>> = cache.resource("/rows");
        assert!(pending.is_pending());

        cache.load("/rows").await.unwrap();
        let rows: Resource<Vec<Row>> = cache.resource("/rows");
        assert_eq!(
            rows.data.unwrap(),
            vec![Row {
                id: 1,
                name: "/rows".to_string()
            }]
        );

        // wrong shape surfaces as an error, not a panic
        let wrong: Resource<String> = cache.resource("/rows");
        assert!(wrong.data.is_none());
        assert!(matches!(wrong.error, Some(ApiError::DecodeError { .. })));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_recorded() {
        let mut fetcher = CountingFetcher::new(Duration::ZERO);
        fetcher.fail = true;
        let cache = ResourceCache::new(Arc::new(fetcher));

        assert!(cache.load("/x").await.is_err());
        let entry = cache.entry("/x");
        assert_eq!(entry.error.unwrap().status(), Some(500));
        assert!(!entry.is_loading);
        assert!(entry.data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_first_load_still_populates_entry() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(50)));
        let cache = ResourceCache::new(fetcher.clone());

        let timed_out = tokio::time::timeout(Duration::from_millis(10), cache.load("/x")).await;
        assert!(timed_out.is_err());
        assert!(cache.entry("/x").is_loading);

        // the next caller joins the abandoned request and finishes it
        let value = cache.load("/x").await.unwrap();
        assert_eq!(value[0]["id"], 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let entry = cache.entry("/x");
        assert!(!entry.is_loading);
        assert_eq!(entry.data, Some(value));
        let rows: Resource<Value> = cache.resource("/x");
        assert!(rows.data.is_some());
    }

    #[tokio::test]
    async fn test_joining_caller_alone_updates_entry() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(20)));
        let cache = ResourceCache::new(fetcher.clone());

        let mut rx = cache.subscribe("/x");
        let (started, joined) = tokio::join!(
            tokio::time::timeout(Duration::from_millis(1), cache.load("/x")),
            cache.load("/x")
        );
        assert!(started.is_err());
        joined.unwrap();

        assert!(rx.has_changed().unwrap());
        let entry = rx.borrow_and_update().clone();
        assert!(!entry.is_loading);
        assert!(entry.data.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidation_polls_until_cancelled() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
        let cache = Arc::new(ResourceCache::new(fetcher.clone()));
        let cancel = CancellationToken::new();

        let handle = cache.spawn_revalidation("/x", Duration::from_secs(5), cancel.clone());
        // first tick fires immediately, then every 5s
        tokio::time::sleep(Duration::from_millis(10_100)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        cancel.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }
}
