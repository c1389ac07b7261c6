//! Fixed-size refresh worker pool
//!
//! A single producer hands jobs one at a time to `worker_count` tasks
//! sharing one receiver:
//!
//! ```text
//!  push(jobs) ──▶ [ slot ] ──▶ worker 0 ──▶ Refresh::refresh ──▶ ScheduledJob::complete
//!                         ├──▶ worker 1
//!                         └──▶ worker N-1
//! ```
//!
//! Each job travels with a `oneshot` sender. `push` counts a job only once a
//! worker has taken it out of the slot and signalled back, so the producer
//! never runs ahead of the workers and every counted job reaches its
//! completion callback. Jobs are handed out in push order; completion order
//! is unspecified.
//!
//! Cancelling the pool's token stops every worker before it takes another
//! job. A refresh already in progress runs to completion. The first worker
//! to see the cancellation closes the channel and drops whatever sits in the
//! slot, so `push` stops at the first job no worker took.
//!
//! # Example
//!
//! ```rust,ignore
//! let pool = Pool::new(cancel.clone(), store.clone(), refresher, 16);
//! pool.push(freshet::scheduler::distribute_jobs(due_jobs)).await;
//! pool.shutdown().await;
//! ```

pub mod job;
pub mod refresh;

pub use job::{CompletionCallback, ScheduledJob};
pub use refresh::{FeedRefresher, FeedSource, Refresh};

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::UserCache;
use crate::error::FreshetErrorTrait;
use crate::metrics;
use crate::models::Job;
use crate::storage::Store;

/// A job in the slot and the signal that a worker took it
struct Handoff {
    scheduled: ScheduledJob,
    taken: oneshot::Sender<()>,
}

/// Worker pool draining a shared hand-off channel
pub struct Pool {
    sender: mpsc::Sender<Handoff>,
    store: Arc<dyn Store>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Pool {
    /// Spawn `worker_count` workers on the current tokio runtime
    pub fn new(
        cancel: CancellationToken,
        store: Arc<dyn Store>,
        refresher: Arc<dyn Refresh>,
        worker_count: usize,
    ) -> Self {
        if worker_count == 0 {
            tracing::warn!("Worker count of 0 requested, starting a single worker");
        }
        let worker_count = worker_count.max(1);

        let (sender, receiver) = mpsc::channel::<Handoff>(1);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&receiver),
                    Arc::clone(&refresher),
                    cancel.clone(),
                ))
            })
            .collect();

        tracing::info!(worker_count, "Worker pool started");

        Self {
            sender,
            store,
            cancel,
            handles,
        }
    }

    /// Number of spawned workers
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Hand jobs to the workers in the given order
    ///
    /// All jobs of one call share a fresh [`UserCache`]. Each job is handed
    /// over only when a worker is free to take it. Returns the number of jobs
    /// taken by a worker; each of them is completed exactly once.
    pub async fn push(&self, jobs: Vec<Job>) -> usize {
        self.dispatch(jobs, None).await
    }

    /// Like [`Pool::push`], invoking `on_complete` after each job finishes
    pub async fn push_with<F>(&self, jobs: Vec<Job>, on_complete: F) -> usize
    where
        F: Fn(&ScheduledJob) + Send + Sync + 'static,
    {
        self.dispatch(jobs, Some(Arc::new(on_complete))).await
    }

    async fn dispatch(&self, jobs: Vec<Job>, on_complete: Option<CompletionCallback>) -> usize {
        let total = jobs.len();
        let users = Arc::new(UserCache::new(Arc::clone(&self.store)));

        for (index, job) in jobs.into_iter().enumerate() {
            let (taken, accepted) = oneshot::channel();
            let handoff = Handoff {
                scheduled: ScheduledJob::new(job, index, Arc::clone(&users), on_complete.clone()),
                taken,
            };
            if self.sender.send(handoff).await.is_err() || accepted.await.is_err() {
                tracing::warn!(
                    pushed = index,
                    dropped = total - index,
                    "Worker pool stopped, dropping remaining jobs"
                );
                return index;
            }
        }

        tracing::debug!(jobs = total, "Jobs pushed");
        total
    }

    /// Stop taking new jobs and wait for in-flight jobs to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Close the queue and wait until every pushed job has been processed
    pub async fn join(self) {
        let Self {
            sender, handles, ..
        } = self;
        drop(sender);

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker task failed");
            }
        }

        tracing::info!("Worker pool stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Handoff>>>,
    refresher: Arc<dyn Refresh>,
    cancel: CancellationToken,
) {
    loop {
        let next = {
            let mut rx = receiver.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    rx.close();
                    while let Ok(Handoff { scheduled, .. }) = rx.try_recv() {
                        tracing::debug!(
                            worker_id,
                            index = scheduled.index,
                            feed_id = scheduled.job.feed_id,
                            "Dropping job that no worker took"
                        );
                    }
                    None
                }
                handoff = rx.recv() => handoff,
            }
        };

        let Some(Handoff { mut scheduled, taken }) = next else {
            break;
        };
        // The producer may have given up waiting
        let _ = taken.send(());

        tracing::debug!(
            worker_id,
            index = scheduled.index,
            feed_id = scheduled.job.feed_id,
            url = %scheduled.job.feed_url,
            "Refreshing feed"
        );

        let result = refresher.refresh(&scheduled.job, &scheduled.users).await;
        metrics::record_refresh_job(result.is_ok());
        if let Err(e) = &result {
            tracing::debug!(
                worker_id,
                feed_id = scheduled.job.feed_id,
                category = %e.category(),
                "Refresh failed"
            );
        }
        scheduled.complete(result);
    }

    tracing::debug!(worker_id, "Worker shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::reconcile::RefreshOutcome;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    /// Fails feed 0, succeeds otherwise
    struct CountingRefresh {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl Refresh for CountingRefresh {
        async fn refresh(&self, job: &Job, _users: &UserCache) -> Result<RefreshOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if job.feed_id == 0 {
                return Err(Error::other("boom"));
            }
            Ok(RefreshOutcome::new())
        }
    }

    /// Holds every refresh until the test hands out permits
    struct GatedRefresh {
        calls: AtomicUsize,
        started: Notify,
        gate: Semaphore,
    }

    #[async_trait]
    impl Refresh for GatedRefresh {
        async fn refresh(&self, _job: &Job, _users: &UserCache) -> Result<RefreshOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            let _permit = self.gate.acquire().await.unwrap();
            Ok(RefreshOutcome::new())
        }
    }

    fn gated_pool(workers: usize) -> (Pool, Arc<GatedRefresh>, CancellationToken) {
        let cancel = CancellationToken::new();
        let refresher = Arc::new(GatedRefresh {
            calls: AtomicUsize::new(0),
            started: Notify::new(),
            gate: Semaphore::new(0),
        });
        let pool = Pool::new(
            cancel.clone(),
            Arc::new(MemoryStore::new()),
            refresher.clone(),
            workers,
        );
        (pool, refresher, cancel)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&ScheduledJob) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        (count, move |_job: &ScheduledJob| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn pool(workers: usize, delay: Duration) -> (Pool, Arc<CountingRefresh>, CancellationToken) {
        let cancel = CancellationToken::new();
        let refresher = Arc::new(CountingRefresh {
            calls: AtomicUsize::new(0),
            delay,
        });
        let pool = Pool::new(
            cancel.clone(),
            Arc::new(MemoryStore::new()),
            refresher.clone(),
            workers,
        );
        (pool, refresher, cancel)
    }

    fn jobs(n: i64) -> Vec<Job> {
        (0..n)
            .map(|i| Job::new(1, i, format!("https://host{i}.example/feed")))
            .collect()
    }

    #[tokio::test]
    async fn test_every_job_runs_once() {
        let (pool, refresher, _cancel) = pool(3, Duration::ZERO);
        assert_eq!(pool.worker_count(), 3);

        let done = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&done);
        let pushed = pool
            .push_with(jobs(10), move |_job: &ScheduledJob| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        pool.join().await;

        assert_eq!(pushed, 10);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 10);
        assert_eq!(done.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_zero_workers_becomes_one() {
        let (pool, refresher, _cancel) = pool(0, Duration::ZERO);
        assert_eq!(pool.worker_count(), 1);
        pool.push(jobs(2)).await;
        pool.join().await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_workers_take_no_jobs() {
        let (pool, refresher, cancel) = pool(2, Duration::ZERO);
        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let pushed = pool.push(jobs(5)).await;
        pool.join().await;

        assert_eq!(pushed, 0);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_finishes_in_flight_job() {
        let (pool, refresher, _cancel) = pool(1, Duration::from_millis(100));

        let done = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&done);
        pool.push_with(jobs(2).split_off(1), move |job: &ScheduledJob| {
            assert!(job.is_success());
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.shutdown().await;

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_push_waits_for_a_free_worker() {
        let (pool, refresher, _cancel) = gated_pool(2);
        let (done, on_complete) = counter();

        let pushed = {
            let push = pool.push_with(jobs(5), on_complete);
            tokio::pin!(push);

            // Both workers busy, a third job in the slot, two not handed over
            assert!(tokio::time::timeout(Duration::from_millis(50), &mut push)
                .await
                .is_err());
            assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
            assert_eq!(done.load(Ordering::SeqCst), 0);

            refresher.gate.add_permits(5);
            push.await
        };
        pool.join().await;

        assert_eq!(pushed, 5);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 5);
        assert_eq!(done.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_cancel_drops_job_waiting_in_slot() {
        let (pool, refresher, cancel) = gated_pool(1);
        let (done, on_complete) = counter();

        let pushed = {
            let push = pool.push_with(jobs(4), on_complete);
            tokio::pin!(push);

            tokio::select! {
                _ = &mut push => panic!("push returned while the only worker was busy"),
                _ = refresher.started.notified() => {}
            }
            cancel.cancel();
            refresher.gate.add_permits(4);
            push.await
        };
        pool.join().await;

        assert_eq!(pushed, 1);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), pushed);
        assert_eq!(done.load(Ordering::SeqCst), pushed);
    }

    #[tokio::test]
    async fn test_cancel_after_push_completes_every_pushed_job() {
        let (pool, refresher, cancel) = pool(1, Duration::from_millis(100));
        let (done, on_complete) = counter();

        let pushed = pool.push_with(jobs(3).split_off(1), on_complete).await;
        cancel.cancel();
        pool.join().await;

        assert_eq!(pushed, 2);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), pushed);
        assert_eq!(done.load(Ordering::SeqCst), pushed);
    }
}
