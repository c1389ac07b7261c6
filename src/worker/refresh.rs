//! Per-feed refresh
//!
//! One refresh takes a job from "feed is due" to "outcome committed":
//!
//! 1. resolve the owner through the cycle's [`UserCache`]
//! 2. load the feed, which must belong to that owner
//! 3. fetch and parse the current entries through a [`FeedSource`]
//! 4. rewrite entry content
//! 5. drop old, filtered and duplicate entries
//! 6. reconcile the survivors against the published index
//! 7. commit the outcome to the store

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::UserCache;
use crate::config::RefreshConfig;
use crate::error::Result;
use crate::filter;
use crate::metrics;
use crate::models::{Entry, Feed, Job};
use crate::reconcile::RefreshOutcome;
use crate::rewrite::{ContentRewriter, NoopRewriter, RewriteRules};
use crate::storage::Store;
use crate::utils::{self, error::SourceError};

/// Work executed by a pool worker for each job
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn refresh(&self, job: &Job, users: &UserCache) -> Result<RefreshOutcome>;
}

/// Fetches a feed and parses it into entries
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_entries(&self, feed: &Feed) -> std::result::Result<Vec<Entry>, SourceError>;
}

/// [`Refresh`] implementation wiring store, source, rewriter, filter and reconciler
pub struct FeedRefresher {
    config: RefreshConfig,
    store: Arc<dyn Store>,
    source: Arc<dyn FeedSource>,
    rewriter: Arc<dyn ContentRewriter>,
    rewrite_rules: Arc<RewriteRules>,
}

impl FeedRefresher {
    pub fn new(config: RefreshConfig, store: Arc<dyn Store>, source: Arc<dyn FeedSource>) -> Self {
        Self {
            config,
            store,
            source,
            rewriter: Arc::new(NoopRewriter),
            rewrite_rules: Arc::new(RewriteRules::new()),
        }
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn ContentRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn with_rewrite_rules(mut self, rules: Arc<RewriteRules>) -> Self {
        self.rewrite_rules = rules;
        self
    }

    /// Rule text for a feed: its own rules, else the site's registered rules
    fn rewrite_rules_for<'a>(&'a self, feed: &'a Feed) -> Option<&'a str> {
        let own = feed.rewrite_rules.trim();
        if !own.is_empty() {
            return Some(own);
        }

        let site = if feed.site_url.is_empty() {
            &feed.feed_url
        } else {
            &feed.site_url
        };
        let host = utils::extract_domain(site).ok()?;
        self.rewrite_rules.rules_for(&host)
    }

    fn prepare_entries(&self, feed: &Feed, entries: &mut [Entry]) {
        let rules = self.rewrite_rules_for(feed);

        for entry in entries.iter_mut() {
            entry.feed_id = feed.id;
            entry.user_id = feed.user_id;
            if entry.hash.is_empty() {
                entry.compute_hash();
            }
            if let Some(rules) = rules {
                self.rewriter.rewrite(entry, rules);
            }
        }
    }
}

#[async_trait]
impl Refresh for FeedRefresher {
    async fn refresh(&self, job: &Job, users: &UserCache) -> Result<RefreshOutcome> {
        let _timer = metrics::start_refresh_timer();

        let user = users.user_by_id(job.user_id).await?;
        let mut feed = self.store.feed_by_id(job.user_id, job.feed_id).await?;

        let mut entries = self.source.fetch_entries(&feed).await?;
        self.prepare_entries(&feed, &mut entries);
        let fetched = entries.len();
        feed.entries = entries;

        let deleted = filter::delete_entries(&user, &mut feed, self.config.max_entry_age_days)?;

        let published = self
            .store
            .published_entries(&feed, self.config.published_scope)
            .await?;

        let mut outcome = RefreshOutcome::with_deletions(deleted);
        outcome.append(&mut feed.entries, &published);

        self.store.commit(&feed, &outcome).await?;
        metrics::record_refresh_outcome(&outcome);

        tracing::info!(
            feed_id = feed.id,
            user_id = feed.user_id,
            fetched,
            created = outcome.created(),
            updated = outcome.updated(),
            dedups = outcome.dedups,
            removed_by_age = outcome.removed_by_age,
            removed_by_filter = outcome.removed_by_filter,
            removed_broken = outcome.removed_broken,
            "Feed refreshed"
        );

        Ok(outcome)
    }
}
