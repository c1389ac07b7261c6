//! Persistence store interface
//!
//! The refresh pipeline reads users, feeds and the published hash index
//! through [`Store`], and commits each [`RefreshOutcome`] through it. Query
//! implementations and transaction discipline belong to the backend.
//! [`MemoryStore`] keeps everything in process memory.

pub mod memory;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

pub use memory::MemoryStore;

use crate::models::{Feed, User};
use crate::reconcile::{PublishedIndex, PublishedScope, RefreshOutcome};
use crate::utils::error::StoreError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Backing store consumed by the refresh pipeline
///
/// Implementations must tolerate concurrent calls from several workers.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load a user record
    async fn user_by_id(&self, user_id: i64) -> StoreResult<User>;

    /// Load a feed owned by `user_id`, without entries
    async fn feed_by_id(&self, user_id: i64, feed_id: i64) -> StoreResult<Feed>;

    /// Most recent stored entry per content hash within `scope`
    async fn published_entries(
        &self,
        feed: &Feed,
        scope: PublishedScope,
    ) -> StoreResult<PublishedIndex>;

    /// Persist created and updated entries
    async fn commit(&self, feed: &Feed, outcome: &RefreshOutcome) -> StoreResult<()>;
}
