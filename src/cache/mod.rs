//! Per-cycle user lookup cache
//!
//! Workers resolve the owner of every feed they refresh. Within one refresh
//! cycle many jobs share an owner, so user records are memoized here and
//! fetched from the [`Store`] at most once per id, even when several workers
//! miss on the same id at the same time.
//!
//! - Fast path: read lock on the map, counted as a hit.
//! - Slow path: callers for the same id are coalesced on a pending
//!   completion signal. The first one fetches and counts one miss; the rest
//!   wait for its result and count as hits.
//!
//! Failed fetches are handed to every waiting caller and are not cached.
//! A fetch abandoned by its caller is retried by whoever waited on it.
//! A cache is built for one cycle and dropped afterwards; it is never
//! invalidated while in use. Its counters are reported to the metrics
//! registry when it is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! let cache = UserCache::new(store.clone());
//! let user = cache.user_by_id(42).await?;
//! println!("hit rate: {:.2}", cache.stats().hit_rate());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};

use crate::models::User;
use crate::storage::Store;
use crate::utils::error::StoreError;

type Lookup = Result<Arc<User>, StoreError>;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served without a store call of their own
    pub hits: u64,
    /// Store fetches performed
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoizing, call-coalescing user cache
pub struct UserCache {
    store: Arc<dyn Store>,
    users: RwLock<HashMap<i64, Arc<User>>>,
    /// One completion signal per id currently being fetched
    pending: Mutex<HashMap<String, watch::Receiver<Option<Lookup>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl UserCache {
    /// Create an empty cache for one refresh cycle
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            users: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Resolve a user, fetching from the store at most once per id
    ///
    /// Only store errors are returned. If the caller doing the fetch is
    /// dropped before it finishes, one of its waiting callers takes over.
    pub async fn user_by_id(&self, id: i64) -> Lookup {
        let key = id.to_string();

        loop {
            if let Some(user) = self.cached(id).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(user);
            }

            let mut pending = self.pending.lock().await;

            if let Some(rx) = pending.get(&key) {
                // A closed channel means the fetching caller was dropped mid-flight.
                if rx.has_changed().is_ok() {
                    let mut rx = rx.clone();
                    drop(pending);
                    match Self::wait_for(&mut rx).await {
                        Some(result) => {
                            self.hits.fetch_add(1, Ordering::Relaxed);
                            return result;
                        }
                        None => {
                            tracing::debug!(user_id = id, "User fetch abandoned, retrying");
                            continue;
                        }
                    }
                }
            }

            // The winning fetch may have published between the fast path and here.
            if let Some(user) = self.cached(id).await {
                drop(pending);
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(user);
            }

            let (tx, rx) = watch::channel(None);
            pending.insert(key.clone(), rx);
            drop(pending);

            self.misses.fetch_add(1, Ordering::Relaxed);
            let result = self.store.user_by_id(id).await.map(Arc::new);

            match &result {
                Ok(user) => {
                    self.users.write().await.insert(id, Arc::clone(user));
                    tracing::debug!(user_id = id, "User cached");
                }
                Err(e) => {
                    tracing::warn!(user_id = id, error = %e, "User lookup failed");
                }
            }

            self.pending.lock().await.remove(&key);
            tx.send_replace(Some(result.clone()));

            return result;
        }
    }

    async fn cached(&self, id: i64) -> Option<Arc<User>> {
        self.users.read().await.get(&id).cloned()
    }

    /// The shared result, or `None` if the fetching caller went away
    async fn wait_for(rx: &mut watch::Receiver<Option<Lookup>>) -> Option<Lookup> {
        match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        }
    }

    /// Current hit and miss counts
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Number of cached users
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

impl Drop for UserCache {
    fn drop(&mut self) {
        let stats = self.stats();
        if stats.hits + stats.misses == 0 {
            return;
        }
        crate::metrics::record_cache_stats(stats);
        tracing::debug!(
            hits = stats.hits,
            misses = stats.misses,
            hit_rate = stats.hit_rate(),
            "User cache released"
        );
    }
}

impl std::fmt::Debug for UserCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::InstrumentedStore;
    use std::time::Duration;

    async fn store_with_user(delay: Option<Duration>) -> Arc<InstrumentedStore> {
        let mut store = InstrumentedStore::new();
        if let Some(delay) = delay {
            store = store.with_lookup_delay(delay);
        }
        store
            .inner
            .insert_user(User {
                id: 7,
                username: "bob".to_string(),
                ..Default::default()
            })
            .await;
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_second_lookup_is_hit() {
        let store = store_with_user(None).await;
        let cache = UserCache::new(store.clone());

        let first = cache.user_by_id(7).await.unwrap();
        let second = cache.user_by_id(7).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.user_lookups(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
        assert!((cache.stats().hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_coalesce() {
        let store = store_with_user(Some(Duration::from_millis(50))).await;
        let cache = Arc::new(UserCache::new(store.clone()));

        let calls = (0..16).map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.user_by_id(7).await })
        });
        let results = futures::future::join_all(calls).await;

        let users: Vec<Arc<User>> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();
        assert!(users.iter().all(|u| Arc::ptr_eq(u, &users[0])));
        assert_eq!(store.user_lookups(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 15, misses: 1 });
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let store = store_with_user(None).await;
        let cache = UserCache::new(store.clone());

        store.set_unavailable(true);
        assert!(matches!(
            cache.user_by_id(7).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(cache.is_empty().await);

        store.set_unavailable(false);
        assert_eq!(cache.user_by_id(7).await.unwrap().username, "bob");
        assert_eq!(store.user_lookups(), 2);
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_error_reaches_every_caller() {
        let store =
            Arc::new(InstrumentedStore::new().with_lookup_delay(Duration::from_millis(50)));
        let cache = Arc::new(UserCache::new(store.clone()));

        let calls = (0..8).map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.user_by_id(99).await })
        });
        let results = futures::future::join_all(calls).await;

        for result in results {
            assert_eq!(result.unwrap(), Err(StoreError::UserNotFound(99)));
        }
        assert_eq!(store.user_lookups(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_fetch_is_retried() {
        let store = store_with_user(Some(Duration::from_millis(200))).await;
        let cache = UserCache::new(store.clone());

        let abandoned = tokio::time::timeout(Duration::from_millis(10), cache.user_by_id(7)).await;
        assert!(abandoned.is_err());

        let user = cache.user_by_id(7).await.unwrap();
        assert_eq!(user.username, "bob");
        assert_eq!(store.user_lookups(), 2);
    }

    #[tokio::test]
    async fn test_waiting_caller_takes_over_dropped_fetch() {
        let store = store_with_user(Some(Duration::from_millis(100))).await;
        let cache = Arc::new(UserCache::new(store.clone()));

        let first = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.user_by_id(7).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.user_by_id(7).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        let user = second.await.unwrap().unwrap();
        assert_eq!(user.username, "bob");
        assert_eq!(store.user_lookups(), 2);
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 2 });
    }
}
