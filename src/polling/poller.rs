/*!
 * Keyed registry of cancelable status-polling tasks.
 *
 * Each poll runs as one tokio task that checks a status endpoint
 * immediately, then again `interval` after the previous check finished, so
 * checks for one key never overlap. The registry holds at most one task per
 * job key; starting a poll for a key that is already being polled aborts the
 * previous task first.
 *
 * Every registration carries a generation number. A task only applies a check
 * result while its generation is still registered, and a terminal result
 * removes the registration under the same lock, so cancellation and
 * completion can never both take effect.
 */

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::job::{JobStatus, PollJob, PollOutcome, StatusRecord};
use crate::errors::BackendError;

/// Interval and optional attempt cap for one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Counts successful status observations; `None` polls until terminal
    pub max_attempts: Option<u32>,
}

impl PollOptions {
    /// Poll every `interval` with no attempt cap
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Give up with a timeout after `max_attempts` non-terminal observations
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Hooks invoked by a running poll.
///
/// Terminal hooks (`on_complete`, `on_failure`, `on_timeout`) fire at most
/// once per poll and never after cancellation.
pub trait PollObserver: Send + Sync {
    /// A status was observed or the job reached a terminal state
    fn on_status(&self, _job: &PollJob) {}

    fn on_complete(&self, _key: &str, _data: &Value) {}

    fn on_failure(&self, _key: &str, _error: &str) {}

    fn on_timeout(&self, _key: &str, _attempts: u32) {}

    /// A status check call itself failed; polling continues
    fn on_check_error(&self, _key: &str, _error: &BackendError) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PollObserver for NoopObserver {}

struct Registration {
    generation: u64,
    task: JoinHandle<()>,
}

struct PollerInner {
    jobs: Mutex<HashMap<String, Registration>>,
    next_generation: AtomicU64,
}

impl PollerInner {
    fn is_current(&self, key: &str, generation: u64) -> bool {
        self.jobs
            .lock()
            .get(key)
            .is_some_and(|registration| registration.generation == generation)
    }

    /// Deregister a poll that reached a terminal state
    fn finish(&self, key: &str, generation: u64) -> bool {
        let mut jobs = self.jobs.lock();
        let current = jobs
            .get(key)
            .is_some_and(|registration| registration.generation == generation);
        if current {
            jobs.remove(key);
        }
        current
    }

    fn cancel_generation(&self, key: &str, generation: u64) -> bool {
        let mut jobs = self.jobs.lock();
        let current = jobs
            .get(key)
            .is_some_and(|registration| registration.generation == generation);
        if !current {
            return false;
        }
        if let Some(registration) = jobs.remove(key) {
            registration.task.abort();
            debug!("Cancelled polling for '{}'", key);
        }
        true
    }
}

impl Drop for PollerInner {
    fn drop(&mut self) {
        for (_, registration) in self.jobs.get_mut().drain() {
            registration.task.abort();
        }
    }
}

/// Keyed registry of polling tasks.
///
/// Cloning yields another handle to the same registry. Dropping the last
/// handle aborts every poll still running.
#[derive(Clone)]
pub struct JobPoller {
    inner: Arc<PollerInner>,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl JobPoller {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PollerInner {
                jobs: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Start polling `key` with `check`, replacing any poll already running
    /// for that key. Must be called from within a tokio runtime.
    pub fn start<F, Fut>(
        &self,
        key: impl Into<String>,
        check: F,
        options: PollOptions,
        observer: Arc<dyn PollObserver>,
    ) -> PollHandle
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StatusRecord, BackendError>> + Send + 'static,
    {
        let key = key.into();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let initial = PollJob::new(&key, options.interval, options.max_attempts);
        let (snapshot_tx, snapshot_rx) = watch::channel(initial.clone());
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let mut jobs = self.inner.jobs.lock();
        if let Some(previous) = jobs.remove(&key) {
            previous.task.abort();
            info!("Replaced running poll for '{}'", key);
        }

        let task = tokio::spawn(run_poll(
            Arc::downgrade(&self.inner),
            initial,
            generation,
            check,
            options,
            observer,
            snapshot_tx,
            outcome_tx,
        ));
        jobs.insert(key.clone(), Registration { generation, task });
        drop(jobs);

        debug!(
            "Polling '{}' every {:?} (max attempts: {:?})",
            key, options.interval, options.max_attempts
        );

        PollHandle {
            key,
            generation,
            registry: Arc::downgrade(&self.inner),
            snapshot: snapshot_rx,
            outcome: outcome_rx,
        }
    }

    /// Cancel whatever poll is running for `key`
    pub fn cancel(&self, key: &str) -> bool {
        let removed = self.inner.jobs.lock().remove(key);
        match removed {
            Some(registration) => {
                registration.task.abort();
                debug!("Cancelled polling for '{}'", key);
                true
            }
            None => false,
        }
    }

    /// Cancel every running poll
    pub fn cancel_all(&self) {
        let drained: Vec<(String, Registration)> = self.inner.jobs.lock().drain().collect();
        for (key, registration) in drained {
            registration.task.abort();
            debug!("Cancelled polling for '{}'", key);
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.inner.jobs.lock().contains_key(key)
    }

    pub fn active_count(&self) -> usize {
        self.inner.jobs.lock().len()
    }
}

/// Caller-side handle to one poll
pub struct PollHandle {
    key: String,
    generation: u64,
    registry: Weak<PollerInner>,
    snapshot: watch::Receiver<PollJob>,
    outcome: oneshot::Receiver<PollOutcome>,
}

impl PollHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stop this poll. Returns false when it had already ended or been
    /// replaced, in which case nothing happens.
    pub fn cancel(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|inner| inner.cancel_generation(&self.key, self.generation))
    }

    /// Whether this poll is still registered and running
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|inner| inner.is_current(&self.key, self.generation))
    }

    /// Latest observed state
    pub fn snapshot(&self) -> PollJob {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<PollJob> {
        self.snapshot.clone()
    }

    /// Wait for the terminal outcome; `None` if the poll was cancelled
    pub async fn wait(self) -> Option<PollOutcome> {
        self.outcome.await.ok()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_poll<F, Fut>(
    registry: Weak<PollerInner>,
    mut job: PollJob,
    generation: u64,
    check: F,
    options: PollOptions,
    observer: Arc<dyn PollObserver>,
    snapshot: watch::Sender<PollJob>,
    outcome_tx: oneshot::Sender<PollOutcome>,
) where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StatusRecord, BackendError>> + Send + 'static,
{
    let key = job.key.clone();

    loop {
        let result = check(key.clone()).await;

        let Some(inner) = registry.upgrade() else {
            return;
        };

        match result {
            Err(error) => {
                if !inner.is_current(&key, generation) {
                    return;
                }
                warn!("Status check for '{}' failed, polling continues: {}", key, error);
                observer.on_check_error(&key, &error);
            }
            Ok(record) => {
                job.attempts += 1;

                let outcome = match record.status {
                    JobStatus::Completed => Some(PollOutcome::Completed(
                        record.data.clone().unwrap_or(Value::Null),
                    )),
                    JobStatus::Failed => Some(PollOutcome::Failed(
                        record
                            .error_detail()
                            .unwrap_or_else(|| "job failed without detail".to_string()),
                    )),
                    _ if options.max_attempts.is_some_and(|max| job.attempts >= max) => {
                        Some(PollOutcome::TimedOut {
                            attempts: job.attempts,
                        })
                    }
                    _ => None,
                };

                let Some(outcome) = outcome else {
                    if !inner.is_current(&key, generation) {
                        return;
                    }
                    job.status = record.status;
                    debug!("'{}' is {} (check {})", key, job.status, job.attempts);
                    snapshot.send_replace(job.clone());
                    observer.on_status(&job);
                    drop(inner);
                    tokio::time::sleep(options.interval).await;
                    continue;
                };

                if !inner.finish(&key, generation) {
                    return;
                }
                drop(inner);

                match &outcome {
                    PollOutcome::Completed(data) => {
                        job.status = JobStatus::Completed;
                        job.result = Some(data.clone());
                    }
                    PollOutcome::Failed(detail) => {
                        job.status = JobStatus::Failed;
                        job.error = Some(detail.clone());
                    }
                    PollOutcome::TimedOut { .. } => {
                        job.status = JobStatus::Timeout;
                    }
                }
                snapshot.send_replace(job.clone());
                observer.on_status(&job);

                match &outcome {
                    PollOutcome::Completed(data) => {
                        info!("'{}' completed after {} checks", key, job.attempts);
                        observer.on_complete(&key, data);
                    }
                    PollOutcome::Failed(detail) => {
                        warn!("'{}' failed: {}", key, detail);
                        observer.on_failure(&key, detail);
                    }
                    PollOutcome::TimedOut { attempts } => {
                        warn!("'{}' still not finished after {} checks, giving up", key, attempts);
                        observer.on_timeout(&key, *attempts);
                    }
                }

                let _ = outcome_tx.send(outcome);
                return;
            }
        }

        drop(inner);
        tokio::time::sleep(options.interval).await;
    }
}
