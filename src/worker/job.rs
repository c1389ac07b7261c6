//! Jobs as they travel through the pool

use std::fmt;
use std::sync::Arc;

use crate::cache::UserCache;
use crate::error::{Error, FreshetErrorTrait};
use crate::models::Job;
use crate::reconcile::RefreshOutcome;

/// Called once per job after its outcome has been recorded
pub type CompletionCallback = Arc<dyn Fn(&ScheduledJob) + Send + Sync>;

/// A [`Job`] wrapped with its pipeline state
pub struct ScheduledJob {
    /// The feed to refresh
    pub job: Job,
    /// Position in the order the jobs were pushed (0-based)
    pub index: usize,
    /// User cache shared by every job of the same push
    pub users: Arc<UserCache>,
    /// Set once the refresh has run
    pub outcome: Option<Result<RefreshOutcome, Error>>,
    on_complete: Option<CompletionCallback>,
}

impl ScheduledJob {
    pub fn new(
        job: Job,
        index: usize,
        users: Arc<UserCache>,
        on_complete: Option<CompletionCallback>,
    ) -> Self {
        Self {
            job,
            index,
            users,
            outcome: None,
            on_complete,
        }
    }

    /// Record the outcome and report it
    ///
    /// Without a completion callback the outcome is logged.
    pub fn complete(&mut self, result: Result<RefreshOutcome, Error>) {
        self.outcome = Some(result);

        if let Some(callback) = self.on_complete.clone() {
            callback(self);
            return;
        }

        match &self.outcome {
            Some(Ok(outcome)) => tracing::debug!(
                index = self.index,
                feed_id = self.job.feed_id,
                created = outcome.created(),
                updated = outcome.updated(),
                "Refresh job completed"
            ),
            Some(Err(e)) => tracing::warn!(
                index = self.index,
                feed_id = self.job.feed_id,
                user_id = self.job.user_id,
                category = %e.category(),
                recoverable = e.is_recoverable(),
                error = %e,
                "Refresh job failed"
            ),
            None => {}
        }
    }

    /// Whether the refresh ran and succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Some(Ok(_)))
    }

    /// The failure, if the refresh ran and failed
    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("job", &self.job)
            .field("index", &self.index)
            .field("outcome", &self.outcome)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}
