//! Refresh job scheduling
//!
//! Due feeds are collected by an external enqueuer, reordered here so that
//! consecutive jobs rarely target the same origin host, and then handed to
//! the [`worker`](crate::worker) pool in that order.
//!
//! ```text
//!   due feeds ──▶ distribute_jobs ──▶ Pool::push ──▶ workers
//! ```
//!
//! Spreading same-host jobs keeps several workers from hitting one origin at
//! the same moment without a per-host rate limiter in the pool.
//!
//! # Example
//!
//! ```
//! use freshet::models::Job;
//! use freshet::scheduler::distribute_jobs;
//!
//! let jobs = vec![
//!     Job::new(1, 1, "https://a.example/feed"),
//!     Job::new(1, 2, "https://a.example/other"),
//!     Job::new(1, 3, "https://b.example/feed"),
//! ];
//! let ordered = distribute_jobs(jobs);
//! let ids: Vec<i64> = ordered.iter().map(|j| j.feed_id).collect();
//! assert_eq!(ids, vec![1, 3, 2]);
//! ```

pub mod distribution;

pub use distribution::{distribute_jobs, group_by_host, HostGroup};
