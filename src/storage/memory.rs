//! In-memory store
//!
//! Keeps users, feeds and entries in maps behind a `tokio::sync::RwLock`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Store, StoreResult};
use crate::models::{Entry, Feed, User};
use crate::reconcile::{index_published, PublishedIndex, PublishedScope, RefreshOutcome};
use crate::utils::error::StoreError;

#[derive(Debug, Default)]
struct MemoryData {
    users: HashMap<i64, User>,
    feeds: HashMap<i64, Feed>,
    entries: Vec<Entry>,
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.data.write().await.users.insert(user.id, user);
    }

    /// Insert a feed; any entries it carries are stored as published
    pub async fn insert_feed(&self, mut feed: Feed) {
        let entries = std::mem::take(&mut feed.entries);
        let mut data = self.data.write().await;
        data.entries.extend(entries);
        data.feeds.insert(feed.id, feed);
    }

    /// Stored entries of one feed
    pub async fn entries_for_feed(&self, feed_id: i64) -> Vec<Entry> {
        self.data
            .read()
            .await
            .entries
            .iter()
            .filter(|e| e.feed_id == feed_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn user_by_id(&self, user_id: i64) -> StoreResult<User> {
        self.data
            .read()
            .await
            .users
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::UserNotFound(user_id))
    }

    async fn feed_by_id(&self, user_id: i64, feed_id: i64) -> StoreResult<Feed> {
        self.data
            .read()
            .await
            .feeds
            .get(&feed_id)
            .filter(|feed| feed.user_id == user_id)
            .cloned()
            .ok_or(StoreError::FeedNotFound { user_id, feed_id })
    }

    async fn published_entries(
        &self,
        feed: &Feed,
        scope: PublishedScope,
    ) -> StoreResult<PublishedIndex> {
        let data = self.data.read().await;
        let entries = data.entries.iter().filter(|e| match scope {
            PublishedScope::Feed => e.feed_id == feed.id,
            PublishedScope::User => e.user_id == feed.user_id,
        });

        Ok(index_published(entries.cloned()))
    }

    async fn commit(&self, feed: &Feed, outcome: &RefreshOutcome) -> StoreResult<()> {
        let mut data = self.data.write().await;
        for updated in &outcome.updated {
            match data
                .entries
                .iter()
                .position(|e| e.feed_id == feed.id && e.hash == updated.hash)
            {
                Some(idx) => data.entries[idx] = updated.clone(),
                None => data.entries.push(updated.clone()),
            }
        }
        data.entries.extend(outcome.created.iter().cloned());
        Ok(())
    }
}
