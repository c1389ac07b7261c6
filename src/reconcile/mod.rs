//! Entry reconciliation
//!
//! Classifies a freshly filtered batch against the entries already stored
//! under the same content hashes:
//!
//! | Stored entry | Incoming entry | Result |
//! |--------------|----------------|--------|
//! | none | any | created, unread |
//! | other feed | newer | created, unread |
//! | other feed | not newer | created, read, counted as dedup |
//! | same feed | newer | updated, unread |
//! | same feed | not newer | unchanged, status copied from stored |
//!
//! Whether the published index spans one feed or every feed of the user is
//! chosen by whoever builds it; see [`PublishedScope`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filter::DeletionStats;
use crate::models::{Entry, EntryStatus};

/// Content hash -> most recent stored entry with that hash
pub type PublishedIndex = HashMap<String, Entry>;

/// Range of stored entries searched when building a [`PublishedIndex`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishedScope {
    /// Only entries of the feed being refreshed
    Feed,
    /// Entries of every feed owned by the user
    #[default]
    User,
}

impl PublishedScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::User => "user",
        }
    }
}

impl fmt::Display for PublishedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PublishedScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feed" => Ok(Self::Feed),
            "user" => Ok(Self::User),
            other => Err(format!("unknown published scope '{other}' (expected feed or user)")),
        }
    }
}

/// Result of reconciling one fetch against prior state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshOutcome {
    /// Entries to insert
    pub created: Vec<Entry>,
    /// Entries whose stored row changed in place
    pub updated: Vec<Entry>,
    /// Cross-feed duplicates inserted as read
    pub dedups: usize,
    pub removed_by_age: usize,
    pub removed_by_filter: usize,
    pub removed_broken: usize,
}

impl RefreshOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an outcome with the counts from the filtering step
    pub fn with_deletions(stats: DeletionStats) -> Self {
        Self {
            removed_by_age: stats.removed_by_age,
            removed_by_filter: stats.removed_by_filter,
            removed_broken: stats.removed_broken,
            ..Default::default()
        }
    }

    /// Classify `entries` against `published`
    ///
    /// Statuses are written back onto `entries`, including entries that end
    /// up in neither list.
    pub fn append(&mut self, entries: &mut [Entry], published: &PublishedIndex) -> &mut Self {
        if published.is_empty() {
            for entry in entries.iter_mut() {
                entry.status = EntryStatus::Unread;
                self.created.push(entry.clone());
            }
            return self;
        }

        for entry in entries.iter_mut() {
            let Some(stored) = published.get(&entry.hash) else {
                entry.status = EntryStatus::Unread;
                self.created.push(entry.clone());
                continue;
            };

            if stored.feed_id != entry.feed_id {
                if entry.date > stored.date {
                    entry.status = EntryStatus::Unread;
                } else {
                    tracing::debug!(
                        hash = %entry.hash,
                        feed_id = entry.feed_id,
                        stored_feed_id = stored.feed_id,
                        "Entry already published by another feed"
                    );
                    entry.status = EntryStatus::Read;
                    self.dedups += 1;
                }
                self.created.push(entry.clone());
            } else if entry.date > stored.date {
                entry.status = EntryStatus::Unread;
                self.updated.push(entry.clone());
            } else {
                entry.status = stored.status;
            }
        }

        self
    }

    pub fn created(&self) -> usize {
        self.created.len()
    }

    pub fn updated(&self) -> usize {
        self.updated.len()
    }

    /// Nothing to persist
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }
}

/// Index entries by hash, keeping the most recent entry per hash
pub fn index_published<I>(entries: I) -> PublishedIndex
where
    I: IntoIterator<Item = Entry>,
{
    let mut index = PublishedIndex::new();
    for entry in entries {
        match index.get(&entry.hash) {
            Some(existing) if existing.date >= entry.date => {}
            _ => {
                index.insert(entry.hash.clone(), entry);
            }
        }
    }
    index
}
