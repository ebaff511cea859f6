//! Task Pipeline
//!
//! FIFO queue with exactly one consumer plus the findings staging area.
//! The fast path submits and drains; the consumer pops one task at a time and
//! runs it to completion before touching the next. Each task runs inside its
//! own spawned tokio task, so an error or a panic only costs that task.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::traits::TaskProcessor;
use crate::models::errors::{AppError, ErrorCategory, ErrorCode};
use crate::models::types::{Finding, PendingTask, PipelineStatsSnapshot};
use crate::utils::constants::DEFAULT_QUEUE_IDLE_SECS;

/// Thread-safe pipeline counters
#[derive(Debug, Default)]
pub struct PipelineStats {
    submitted: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    findings: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panicking task never holds these locks, the data is still consistent
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Queue + single consumer + findings staging
pub struct TaskPipeline {
    queue: Arc<Mutex<VecDeque<PendingTask>>>,
    staging: Arc<Mutex<Vec<Finding>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<PipelineStats>,
    idle_interval: Duration,
}

impl Default for TaskPipeline {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_QUEUE_IDLE_SECS))
    }
}

impl TaskPipeline {
    /// Create a pipeline whose idle consumer re-checks the queue every `idle_interval`
    pub fn new(idle_interval: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            staging: Arc::new(Mutex::new(Vec::new())),
            consumer: Mutex::new(None),
            stats: Arc::new(PipelineStats::default()),
            idle_interval,
        }
    }

    /// Append a task to the tail of the queue, returning the new queue length
    pub fn submit(&self, task: PendingTask) -> usize {
        let mut queue = lock(&self.queue);
        queue.push_back(task);
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        queue.len()
    }

    pub fn queue_len(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Start the consumer loop on the current Tokio runtime
    ///
    /// Returns `false` if one is already running, or if there is no runtime to
    /// spawn on (tasks stay queued until a later call succeeds).
    pub fn start_consumer(&self, processor: Arc<dyn TaskProcessor>) -> bool {
        let mut consumer = lock(&self.consumer);
        if consumer.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return false;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("⚠️ No Tokio runtime, task consumer not started");
            return false;
        };

        let queue = self.queue.clone();
        let staging = self.staging.clone();
        let stats = self.stats.clone();
        let idle = self.idle_interval;

        *consumer = Some(runtime.spawn(async move {
            consume(queue, staging, stats, processor, idle).await;
        }));
        info!("🧵 Task consumer started (idle interval {:?})", idle);
        true
    }

    /// Take everything staged so far, leaving the staging area empty
    pub fn drain_findings(&self) -> Vec<Finding> {
        std::mem::take(&mut *lock(&self.staging))
    }

    pub fn stats(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            processed: self.stats.processed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            findings: self.stats.findings.load(Ordering::Relaxed),
            queued: self.queue_len(),
        }
    }
}

impl Drop for TaskPipeline {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.consumer).take() {
            handle.abort();
        }
    }
}

async fn consume(
    queue: Arc<Mutex<VecDeque<PendingTask>>>,
    staging: Arc<Mutex<Vec<Finding>>>,
    stats: Arc<PipelineStats>,
    processor: Arc<dyn TaskProcessor>,
    idle: Duration,
) {
    loop {
        let next = lock(&queue).pop_front();
        let Some(task) = next else {
            tokio::time::sleep(idle).await;
            continue;
        };

        let task_id = task.id;
        let contract = task.contract_address;
        let worker = processor.clone();
        let outcome = tokio::spawn(async move { worker.process(&task).await }).await;

        let result = match outcome {
            Ok(result) => result,
            Err(join_error) => Err(AppError::new(
                ErrorCode::TaskPanicked,
                format!("task {} aborted: {}", task_id, join_error),
            )),
        };

        match result {
            Ok(findings) => {
                stats.processed.fetch_add(1, Ordering::Relaxed);
                if findings.is_empty() {
                    debug!("✅ {} clean", contract);
                    continue;
                }
                info!("🚨 {} produced {} finding(s)", contract, findings.len());
                stats
                    .findings
                    .fetch_add(findings.len() as u64, Ordering::Relaxed);
                lock(&staging).extend(findings);
            }
            Err(err) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                match err.category() {
                    ErrorCategory::Unsupported => {
                        debug!("⏭️ Skipped {} [{}]: {}", contract, err.code_str(), err.message)
                    }
                    _ => warn!("❌ Task {} for {} failed: {}", task_id, contract, err),
                }
            }
        }
    }
}
