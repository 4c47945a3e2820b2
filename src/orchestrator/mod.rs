//! The orchestration engine: a bounded worker pool over two FIFO queues.
//!
//! The [`Orchestrator`] is the public façade. Callers submit scan jobs,
//! then repeatedly ask for the next result; `None` is the distinguished
//! termination signal meaning every submitted job has been drained. The
//! orchestrator owns the worker lifecycle: workers start when
//! [`OrchestratorBuilder::start`] is called and are signalled and awaited by
//! [`Orchestrator::shutdown`].

mod queue;
mod worker;

use std::collections::HashMap;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::core::{ArcScanner, ScanError, Scanner, ScannerKind, TaskId, TaskResult};
use crate::orchestrator::queue::{ScanTask, TaskQueue};
use crate::orchestrator::worker::Worker;

/// Default number of concurrent workers.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Default bounded-poll interval for queue operations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Builder for an [`Orchestrator`].
pub struct OrchestratorBuilder {
    scanners: HashMap<ScannerKind, ArcScanner>,
    worker_count: usize,
    poll_interval: Duration,
}

impl OrchestratorBuilder {
    /// Creates a builder with default pool settings.
    pub fn new() -> Self {
        Self {
            scanners: HashMap::new(),
            worker_count: DEFAULT_WORKER_COUNT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Registers a scanner backend for its kind.
    pub fn add_scanner<S: Scanner + 'static>(self, scanner: S) -> Self {
        self.add_arc_scanner(std::sync::Arc::new(scanner))
    }

    /// Registers a scanner already wrapped in an `Arc`.
    pub fn add_arc_scanner(mut self, scanner: ArcScanner) -> Self {
        self.scanners.insert(scanner.kind(), scanner);
        self
    }

    /// Sets the number of workers (at least one).
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }

    /// Sets the bounded-poll interval used by workers and `next_result`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Spawns the worker pool and returns the running orchestrator.
    pub fn start(self) -> Result<Orchestrator, ScanError> {
        if self.scanners.is_empty() {
            return Err(ScanError::configuration("at least one scanner is required"));
        }

        let tasks = TaskQueue::new();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let workers = (1..=self.worker_count)
            .map(|worker_no| {
                Worker::spawn(
                    format!("worker_{worker_no}"),
                    tasks.consumer(),
                    results_tx.clone(),
                    self.poll_interval,
                )
            })
            .collect();

        Ok(Orchestrator {
            scanners: self.scanners,
            tasks,
            results_rx,
            workers,
            poll_interval: self.poll_interval,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinates a fixed pool of workers consuming scan jobs.
pub struct Orchestrator {
    scanners: HashMap<ScannerKind, ArcScanner>,
    tasks: TaskQueue,
    results_rx: mpsc::UnboundedReceiver<TaskResult>,
    workers: Vec<Worker>,
    poll_interval: Duration,
}

impl Orchestrator {
    /// Creates a new builder.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Submits one scan job and returns its correlation key.
    ///
    /// Returns immediately; the queue is unbounded, so no admission control
    /// is applied. Duplicate submissions are legal and produce independent
    /// results.
    ///
    /// # Errors
    ///
    /// `EmptyTarget` if `target` is empty, `UnsupportedScanner` if no
    /// backend is registered for `scanner`. Both indicate a mistake by the
    /// submitter and are never retried.
    pub fn submit(&self, scanner: ScannerKind, target: &str) -> Result<TaskId, ScanError> {
        if target.is_empty() {
            return Err(ScanError::EmptyTarget);
        }
        let backend = self
            .scanners
            .get(&scanner)
            .cloned()
            .ok_or(ScanError::UnsupportedScanner { kind: scanner })?;

        let id = TaskId::new(scanner, target);
        let job_target = target.to_string();
        let op = async move { backend.scan(&job_target).await }.boxed();
        self.tasks.push(ScanTask { id: id.clone(), op })?;
        tracing::debug!(task = %id, "scan job queued");
        Ok(id)
    }

    /// Waits for the next completed result.
    ///
    /// Returns `None` — the termination signal — once the task queue is
    /// empty, the result queue is empty, and no worker is busy. The
    /// condition is re-evaluated on every poll cycle rather than computed
    /// once, so a result enqueued at the instant of an emptiness check is
    /// still delivered. Results arrive in completion order, not submission
    /// order.
    pub async fn next_result(&mut self) -> Option<TaskResult> {
        loop {
            if self.is_drained().await {
                return None;
            }
            match timeout(self.poll_interval, self.results_rx.recv()).await {
                Ok(Some(result)) => return Some(result),
                Ok(None) => return None,
                Err(_) => {} // poll expired; re-evaluate the drain condition
            }
        }
    }

    /// Signals every worker to stop and awaits them all.
    ///
    /// In-flight jobs are allowed to finish; only the pickup of new work
    /// stops. The task sender is dropped with `self`, so even a worker that
    /// misses the stop flag exits once it observes the closed channel.
    pub async fn shutdown(mut self) {
        for worker in &self.workers {
            worker.request_stop();
        }
        for worker in self.workers.drain(..) {
            worker.wait_until_stopped().await;
        }
        tracing::debug!("orchestrator shut down");
    }

    /// Returns the number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    // Task emptiness and worker idleness are observed under the task queue
    // lock; a worker raises its busy flag before releasing that lock and
    // lowers it only after its result is enqueued. Checking the result
    // queue last therefore leaves no interleaving in which a result is in
    // flight once all three checks pass.
    async fn is_drained(&self) -> bool {
        let workers = &self.workers;
        let no_pending_work = self
            .tasks
            .is_empty_and(|| !workers.iter().any(Worker::is_busy))
            .await;
        no_pending_work && self.results_rx.is_empty()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("scanners", &self.scanners.keys().collect::<Vec<_>>())
            .field("worker_count", &self.workers.len())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
