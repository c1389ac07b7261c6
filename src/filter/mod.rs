//! Entry filter rule engine
//!
//! Users, feeds and categories carry block and keep rules written one per
//! line as `field=pattern`:
//!
//! ```text
//! EntryTitle=(?i)sponsored
//! EntryTag=^podcast$
//! EntryDate=max-age:30d
//! ```
//!
//! Blank lines are skipped; surrounding whitespace and a trailing `\r` are
//! stripped. Rule sets from every scope are concatenated, so a user rule and
//! a feed rule are OR'd together.
//!
//! [`delete_entries`] runs once per refresh over the freshly parsed batch and
//! removes, in order: entries older than the global age limit, entries that
//! are blocked or not kept, and entries repeating a hash already seen earlier
//! in the batch.

pub mod date;
pub mod error;
pub mod rule;

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

pub use error::{FilterError, FilterResult, RuleError, RuleKind, RuleScope};
pub use rule::{Field, Rule};

use crate::models::{Entry, Feed, User};

/// Ordered list of rules
#[derive(Debug, Clone, Default)]
pub struct Filter {
    rules: Vec<Rule>,
}

impl Filter {
    /// Empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile newline-separated rule text
    ///
    /// Errors carry the 1-based line number and the rule set they came from.
    pub fn parse(text: &str, scope: RuleScope, kind: RuleKind) -> FilterResult<Self> {
        let mut rules = Vec::new();

        for (idx, raw) in text.split('\n').enumerate() {
            let line = raw.trim_end_matches('\r').trim();
            if line.is_empty() {
                continue;
            }

            let rule = Rule::parse(line).map_err(|source| FilterError::InvalidRule {
                scope,
                kind,
                line: idx + 1,
                source,
            })?;
            rules.push(rule);
        }

        Ok(Self { rules })
    }

    /// Append the rules of another filter
    pub fn extend(&mut self, other: Filter) {
        self.rules.extend(other.rules);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True when any rule matches
    pub fn matches(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        self.rules.iter().any(|rule| rule.matches(entry, now))
    }

    /// True when the filter is empty or any rule matches
    pub fn allows(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        self.is_empty() || self.matches(entry, now)
    }
}

/// Counts reported by [`delete_entries`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionStats {
    /// Older than the global age limit
    pub removed_by_age: usize,
    /// Blocked, or not matched by a non-empty keep filter
    pub removed_by_filter: usize,
    /// Repeated hash inside the batch
    pub removed_broken: usize,
}

impl DeletionStats {
    pub fn total(&self) -> usize {
        self.removed_by_age + self.removed_by_filter + self.removed_broken
    }
}

/// Combined block and keep filters for one feed
#[derive(Debug, Clone, Default)]
pub struct FeedFilters {
    pub block: Filter,
    pub keep: Filter,
}

impl FeedFilters {
    /// Build from user, feed and category rule text
    pub fn for_feed(user: &User, feed: &Feed) -> FilterResult<Self> {
        let mut block = Filter::parse(
            &user.block_filter_entry_rules,
            RuleScope::User,
            RuleKind::Block,
        )?;
        let mut keep = Filter::parse(
            &user.keep_filter_entry_rules,
            RuleScope::User,
            RuleKind::Keep,
        )?;

        block.extend(Filter::parse(
            &feed.block_filter_rules,
            RuleScope::Feed,
            RuleKind::Block,
        )?);
        keep.extend(Filter::parse(
            &feed.keep_filter_rules,
            RuleScope::Feed,
            RuleKind::Keep,
        )?);

        if let Some(category) = &feed.category {
            block.extend(Filter::parse(
                &category.block_filter_rules,
                RuleScope::Category,
                RuleKind::Block,
            )?);
            keep.extend(Filter::parse(
                &category.keep_filter_rules,
                RuleScope::Category,
                RuleKind::Keep,
            )?);
        }

        Ok(Self { block, keep })
    }
}

/// Remove unwanted entries from `feed.entries` in place
///
/// `max_age_days` of zero disables the age cutoff. On a rule error the
/// entries are left untouched.
pub fn delete_entries(
    user: &User,
    feed: &mut Feed,
    max_age_days: u32,
) -> FilterResult<DeletionStats> {
    delete_entries_at(user, feed, max_age_days, Utc::now())
}

/// [`delete_entries`] evaluated at a fixed instant
pub fn delete_entries_at(
    user: &User,
    feed: &mut Feed,
    max_age_days: u32,
    now: DateTime<Utc>,
) -> FilterResult<DeletionStats> {
    let filters = FeedFilters::for_feed(user, feed)?;
    let cutoff = (max_age_days > 0)
        .then(|| now.checked_sub_signed(Duration::days(i64::from(max_age_days))))
        .flatten();

    let mut stats = DeletionStats::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(feed.entries.len());
    let feed_id = feed.id;

    feed.entries.retain(|entry| {
        if cutoff.is_some_and(|cutoff| entry.date < cutoff) {
            tracing::debug!(
                feed_id,
                url = %entry.url,
                date = %entry.date,
                "Entry older than max age"
            );
            stats.removed_by_age += 1;
            return false;
        }

        if filters.block.matches(entry, now) || !filters.keep.allows(entry, now) {
            tracing::debug!(feed_id, url = %entry.url, "Entry removed by filter rules");
            stats.removed_by_filter += 1;
            return false;
        }

        if !seen.insert(entry.hash.clone()) {
            tracing::warn!(
                feed_id,
                hash = %entry.hash,
                url = %entry.url,
                "Duplicate entry hash in feed batch"
            );
            stats.removed_broken += 1;
            return false;
        }

        true
    });

    Ok(stats)
}
