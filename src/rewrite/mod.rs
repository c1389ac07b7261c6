//! Content rewriting hook
//!
//! Entries pass through a [`ContentRewriter`] between parsing and filtering.
//! The rule text handed to it comes from the feed itself or, when the feed
//! has none, from a [`RewriteRules`] table keyed by site domain.

use std::collections::HashMap;

use crate::models::Entry;

/// Mutates an entry's content or title in place according to rule text
pub trait ContentRewriter: Send + Sync {
    fn rewrite(&self, entry: &mut Entry, rules: &str);
}

/// Rewriter that leaves entries unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRewriter;

impl ContentRewriter for NoopRewriter {
    fn rewrite(&self, _entry: &mut Entry, _rules: &str) {}
}

/// Immutable domain -> rule text table
///
/// Built once at startup and shared by reference. A lookup for
/// `www.example.com` falls back to `example.com` and then `com`; the
/// longest registered suffix that ends on a label boundary wins.
#[derive(Debug, Clone, Default)]
pub struct RewriteRules {
    by_domain: HashMap<String, String>,
}

impl RewriteRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register rule text for a domain and every subdomain of it
    pub fn with_domain(mut self, domain: &str, rules: impl Into<String>) -> Self {
        let domain = domain.trim().trim_matches('.').to_ascii_lowercase();
        self.by_domain.insert(domain, rules.into());
        self
    }

    pub fn len(&self) -> usize {
        self.by_domain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_domain.is_empty()
    }

    /// Rule text registered for the longest matching suffix of `host`
    pub fn rules_for(&self, host: &str) -> Option<&str> {
        if self.by_domain.is_empty() {
            return None;
        }

        let host = host.trim_end_matches('.').to_ascii_lowercase();
        let mut candidate = host.as_str();
        loop {
            if let Some(rules) = self.by_domain.get(candidate) {
                return Some(rules.as_str());
            }
            match candidate.split_once('.') {
                Some((_, parent)) if !parent.is_empty() => candidate = parent,
                _ => return None,
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RewriteRules
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |rules, (domain, text)| {
                rules.with_domain(domain.as_ref(), text)
            })
    }
}
