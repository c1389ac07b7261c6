//! Common test utilities

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use freshet::models::{Entry, Feed, Job, User};
use freshet::reconcile::{PublishedIndex, PublishedScope, RefreshOutcome};
use freshet::storage::{MemoryStore, Store, StoreResult};
use freshet::utils::error::SourceError;
use freshet::worker::FeedSource;

/// Fixed reference instant
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap()
}

/// Parsed item as a feed source would return it (hash computed from the URL)
pub fn item(url: &str, title: &str, date: DateTime<Utc>) -> Entry {
    let mut entry = Entry {
        url: url.to_string(),
        title: title.to_string(),
        date,
        ..Default::default()
    };
    entry.compute_hash();
    entry
}

/// Item dated `minutes` after [`base_time`]
pub fn item_at(url: &str, minutes: i64) -> Entry {
    item(url, &format!("item {url}"), base_time() + Duration::minutes(minutes))
}

pub fn job_for(feed: &Feed) -> Job {
    Job::new(feed.user_id, feed.id, feed.feed_url.clone())
}

/// Feed source serving scripted batches per feed id
#[derive(Default)]
pub struct ScriptedSource {
    batches: Mutex<HashMap<i64, Vec<Entry>>>,
    failing: Mutex<HashSet<i64>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Entries returned for every fetch of `feed_id` from now on
    pub fn serve(&self, feed_id: i64, entries: Vec<Entry>) {
        self.batches.lock().unwrap().insert(feed_id, entries);
    }

    /// Make fetches of `feed_id` fail with a server error
    pub fn fail(&self, feed_id: i64) {
        self.failing.lock().unwrap().insert(feed_id);
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch_entries(&self, feed: &Feed) -> Result<Vec<Entry>, SourceError> {
        if self.failing.lock().unwrap().contains(&feed.id) {
            return Err(SourceError::Status {
                url: feed.feed_url.clone(),
                status: 503,
            });
        }
        Ok(self
            .batches
            .lock()
            .unwrap()
            .get(&feed.id)
            .cloned()
            .unwrap_or_default())
    }
}

/// [`MemoryStore`] that counts user lookups and commits reaching it
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    user_lookups: AtomicU64,
    commits: AtomicU64,
}

impl CountingStore {
    pub fn user_lookups(&self) -> u64 {
        self.user_lookups.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    pub async fn entries_for_feed(&self, feed_id: i64) -> Vec<Entry> {
        self.inner.entries_for_feed(feed_id).await
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn user_by_id(&self, user_id: i64) -> StoreResult<User> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
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
        self.inner.commit(feed, outcome).await?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Store with one user (id 1) owning feeds 10 and 11 on different hosts
pub async fn seeded_store() -> (Arc<CountingStore>, Feed, Feed) {
    let store = CountingStore::default();
    store
        .inner
        .insert_user(User {
            id: 1,
            username: "reader".to_string(),
            ..Default::default()
        })
        .await;

    let first = Feed {
        id: 10,
        user_id: 1,
        feed_url: "https://alpha.example/feed.xml".to_string(),
        title: "Alpha".to_string(),
        ..Default::default()
    };
    let second = Feed {
        id: 11,
        user_id: 1,
        feed_url: "https://beta.example/rss".to_string(),
        title: "Beta".to_string(),
        ..Default::default()
    };
    store.inner.insert_feed(first.clone()).await;
    store.inner.insert_feed(second.clone()).await;

    (Arc::new(store), first, second)
}
