//! freshet - Feed refresh engine
//!
//! The concurrent core of a feed reader: decides in what order due feeds are
//! refreshed, runs the refreshes on a fixed worker pool, and turns every
//! fetched batch into create/update decisions against stored entries.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scheduler`] - Host-fair interleaving of due jobs
//! - [`worker`] - Worker pool and the per-feed refresh pipeline
//! - [`cache`] - Per-cycle user lookup cache with call coalescing
//! - [`filter`] - Block/keep rule engine and batch cleanup
//! - [`reconcile`] - Content-hash reconciliation against published entries
//! - [`rewrite`] - Content rewriting hook and domain rule table
//! - [`storage`] - Persistence interface and in-memory store
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//! - [`models`] - Core data structures and types
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use freshet::config::Config;
//! use freshet::scheduler::distribute_jobs;
//! use freshet::storage::MemoryStore;
//! use freshet::worker::{FeedRefresher, FeedSource, Pool};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(source: Arc<dyn FeedSource>) -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let store = Arc::new(MemoryStore::new());
//! let refresher = Arc::new(FeedRefresher::new(config.refresh.clone(), store.clone(), source));
//!
//! let pool = Pool::new(CancellationToken::new(), store, refresher, config.worker.pool_size);
//! pool.push(distribute_jobs(Vec::new())).await;
//! pool.join().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod reconcile;
pub mod rewrite;
pub mod scheduler;
pub mod storage;
pub mod utils;
pub mod worker;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{CacheStats, UserCache};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, FreshetErrorTrait, Result};
    pub use crate::filter::{delete_entries, DeletionStats, Filter};
    pub use crate::models::{Entry, EntryStatus, Feed, Job, User};
    pub use crate::reconcile::{PublishedIndex, PublishedScope, RefreshOutcome};
    pub use crate::scheduler::distribute_jobs;
    pub use crate::storage::{MemoryStore, Store};
    pub use crate::worker::{FeedRefresher, FeedSource, Pool, Refresh, ScheduledJob};
}

// Direct re-exports for convenience
pub use models::{Entry, Feed, Job, User};
