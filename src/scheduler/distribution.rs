//! Host-fair job distribution
//!
//! Reorders a batch of due jobs so that jobs hitting the same origin host are
//! spread apart, while jobs for one host keep their original relative order.

use std::collections::{HashMap, VecDeque};

use crate::models::Job;
use crate::utils::host_key;

// ============================================================================
// Host Groups
// ============================================================================

/// Jobs sharing an origin host, in original appearance order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostGroup {
    /// Hostname, or the raw feed URL when it has no parsable host
    pub host: String,

    /// Remaining jobs for this host
    pub jobs: VecDeque<Job>,
}

impl HostGroup {
    fn new(host: String) -> Self {
        Self {
            host,
            jobs: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Partition jobs by host key, groups ordered by first appearance
pub fn group_by_host(jobs: Vec<Job>) -> Vec<HostGroup> {
    let mut groups: Vec<HostGroup> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for job in jobs {
        let host = host_key(&job.feed_url);
        let slot = match slots.get(&host) {
            Some(&slot) => slot,
            None => {
                slots.insert(host.clone(), groups.len());
                groups.push(HostGroup::new(host));
                groups.len() - 1
            }
        };
        groups[slot].jobs.push_back(job);
    }

    groups
}

// ============================================================================
// Distribution
// ============================================================================

/// Interleave jobs so the same host is not hit back to back
///
/// Each round sorts the non-empty host groups by remaining size, largest
/// first, and takes one job from each. The sort is stable, so ties keep the
/// previous round's order (first appearance in the first round). Two jobs for
/// one host only end up adjacent once every other host has run out.
pub fn distribute_jobs(jobs: Vec<Job>) -> Vec<Job> {
    let total = jobs.len();
    let mut groups = group_by_host(jobs);
    let mut distributed = Vec::with_capacity(total);

    while !groups.is_empty() {
        groups.sort_by(|a, b| b.len().cmp(&a.len()));

        for group in groups.iter_mut() {
            if let Some(job) = group.jobs.pop_front() {
                distributed.push(job);
            }
        }

        groups.retain(|group| !group.is_empty());
    }

    tracing::debug!(jobs = total, "Distributed jobs across hosts");
    distributed
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: i64, host: &str) -> Job {
        Job::new(1, id, format!("https://{host}/feed/{id}"))
    }

    fn hosts(jobs: &[Job]) -> Vec<String> {
        jobs.iter().map(|j| host_key(&j.feed_url)).collect()
    }

    fn jobs_for(hosts: &[&str]) -> Vec<Job> {
        hosts
            .iter()
            .enumerate()
            .map(|(i, h)| job(i as i64, h))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(distribute_jobs(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_host_keeps_order() {
        let jobs = jobs_for(&["a", "a", "a"]);
        let out = distribute_jobs(jobs.clone());
        assert_eq!(out, jobs);
    }

    #[test]
    fn test_two_and_one() {
        let out = distribute_jobs(jobs_for(&["a", "a", "b"]));
        assert_eq!(hosts(&out), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_larger_group_leads() {
        let out = distribute_jobs(jobs_for(&["a", "b", "b", "b"]));
        assert_eq!(hosts(&out), vec!["b", "a", "b", "b"]);
    }

    #[test]
    fn test_three_hosts() {
        let out = distribute_jobs(jobs_for(&["c", "b", "b", "b", "a", "a"]));
        assert_eq!(hosts(&out), vec!["b", "a", "c", "b", "a", "b"]);
    }

    #[test]
    fn test_order_within_host_preserved() {
        let out = distribute_jobs(jobs_for(&["a", "b", "a", "b", "a"]));
        let a_ids: Vec<i64> = out
            .iter()
            .filter(|j| j.feed_url.contains("//a/"))
            .map(|j| j.feed_id)
            .collect();
        assert_eq!(a_ids, vec![0, 2, 4]);
    }

    #[test]
    fn test_unparsable_urls_group_by_literal() {
        let jobs = vec![
            Job::new(1, 1, "not a url"),
            Job::new(1, 2, "not a url"),
            Job::new(1, 3, "https://example.com/rss"),
        ];
        let out = distribute_jobs(jobs);
        let ids: Vec<i64> = out.iter().map(|j| j.feed_id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_group_by_host_first_appearance() {
        let groups = group_by_host(jobs_for(&["b", "a", "b", "c"]));
        let keys: Vec<&str> = groups.iter().map(|g| g.host.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(groups[0].len(), 2);
    }
}
