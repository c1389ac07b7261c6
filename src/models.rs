// Core data structures for the freshet refresh engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One feed due for refresh
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    pub user_id: i64,
    pub feed_id: i64,
    pub feed_url: String,
}

impl Job {
    pub fn new(user_id: i64, feed_id: i64, feed_url: impl Into<String>) -> Self {
        Self {
            user_id,
            feed_id,
            feed_url: feed_url.into(),
        }
    }
}

/// Owner of a feed, as seen by the refresh pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub block_filter_entry_rules: String,
    pub keep_filter_entry_rules: String,
}

/// Category a feed belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub block_filter_rules: String,
    pub keep_filter_rules: String,
}

/// A subscribed feed together with the batch of entries being refreshed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub user_id: i64,
    pub feed_url: String,
    pub site_url: String,
    pub title: String,
    pub block_filter_rules: String,
    pub keep_filter_rules: String,
    pub rewrite_rules: String,
    pub category: Option<Category>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// Read state of an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Unread,
    Read,
    Removed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
            Self::Removed => "removed",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One parsed and normalized feed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub hash: String,
    pub feed_id: i64,
    pub user_id: i64,
    pub date: DateTime<Utc>,
    pub status: EntryStatus,
    pub author: String,
    pub title: String,
    pub url: String,
    pub comments_url: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            hash: String::new(),
            feed_id: 0,
            user_id: 0,
            date: Utc::now(),
            status: EntryStatus::Unread,
            author: String::new(),
            title: String::new(),
            url: String::new(),
            comments_url: String::new(),
            content: String::new(),
            tags: Vec::new(),
        }
    }
}

impl Entry {
    /// SHA256 hex digest used as content identity
    pub fn hash_of(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Recompute the hash from the URL, falling back to title and content
    pub fn compute_hash(&mut self) {
        self.hash = if self.url.is_empty() {
            Self::hash_of(&format!("{}{}", self.title, self.content))
        } else {
            Self::hash_of(&self.url)
        };
    }
}
