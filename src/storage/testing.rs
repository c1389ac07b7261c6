//! Instrumented store for unit tests

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{MemoryStore, Store, StoreResult};
use crate::models::{Feed, User};
use crate::reconcile::{PublishedIndex, PublishedScope, RefreshOutcome};
use crate::utils::error::StoreError;

/// [`MemoryStore`] with lookup counting, an injected delay and an outage switch
#[derive(Debug, Default)]
pub(crate) struct InstrumentedStore {
    pub inner: MemoryStore,
    user_lookups: AtomicU64,
    lookup_delay: Option<Duration>,
    unavailable: AtomicBool,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every user lookup, to widen race windows
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    /// Make user lookups fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `user_by_id` calls that reached the store
    pub fn user_lookups(&self) -> u64 {
        self.user_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for InstrumentedStore {
    async fn user_by_id(&self, user_id: i64) -> StoreResult<User> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        self.inner.user_by_id(user_id).await
    }

    async fn feed_by_id(&self, user_id: i64, feed_id: i64) -> StoreResult<Feed> {
        self.inner.feed_by_id(user_id, feed_id).await
    }

    async fn published_entries(
        &self,
        feed: &Feed,
        scope: PublishedScope,
    ) -> StoreResult<PublishedIndex> {
        self.inner.published_entries(feed, scope).await
    }

    async fn commit(&self, feed: &Feed, outcome: &RefreshOutcome) -> StoreResult<()> {
        self.inner.commit(feed, outcome).await
    }
}
