//! The FIFO task queue shared between the orchestrator and its workers.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

use crate::core::{ScanError, ScanOutcome, TaskId};

/// A queued unit of work: a correlation key plus the deferred scan
/// operation. Consumed exactly once by exactly one worker.
pub(crate) struct ScanTask {
    /// Correlation key for the eventual result.
    pub(crate) id: TaskId,
    /// The scan operation, started only when a worker picks the task up.
    pub(crate) op: BoxFuture<'static, Result<ScanOutcome, ScanError>>,
}

impl fmt::Debug for ScanTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanTask")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Outcome of one bounded poll of the task queue.
pub(crate) enum PollOutcome {
    /// A task was dequeued; the polling worker's busy flag is already set.
    Task(ScanTask),
    /// The poll interval expired with no task available.
    TimedOut,
    /// The sending side is gone; no task will ever arrive again.
    Closed,
}

/// Unbounded FIFO for pending scan tasks.
///
/// The orchestrator holds the queue and its sending half; workers only ever
/// hold [`TaskConsumer`] handles, so dropping the orchestrator closes the
/// channel and lets every idle worker observe [`PollOutcome::Closed`].
pub(crate) struct TaskQueue {
    tx: mpsc::UnboundedSender<ScanTask>,
    consumer: TaskConsumer,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            consumer: TaskConsumer {
                rx: Arc::new(Mutex::new(rx)),
            },
        }
    }

    /// Enqueues a task. No admission control is applied.
    pub(crate) fn push(&self, task: ScanTask) -> Result<(), ScanError> {
        self.tx.send(task).map_err(|_| ScanError::QueueClosed)
    }

    /// Returns a consuming handle for a worker.
    pub(crate) fn consumer(&self) -> TaskConsumer {
        self.consumer.clone()
    }

    /// Returns `true` if the queue is empty and `all_idle` holds, both
    /// observed under the queue lock.
    pub(crate) async fn is_empty_and<F>(&self, all_idle: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        self.consumer.is_empty_and(all_idle).await
    }
}

/// The receiving half of the task queue, shared across workers.
///
/// The mutex around the receiver is also what makes termination detection
/// sound: a worker raises its busy flag *before* releasing the lock on a
/// successful dequeue, and [`TaskConsumer::is_empty_and`] evaluates
/// emptiness and worker idleness under the same lock, so a
/// dequeued-but-not-yet-busy gap can never be observed.
#[derive(Clone)]
pub(crate) struct TaskConsumer {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<ScanTask>>>,
}

impl TaskConsumer {
    /// Polls for a task, waiting at most `interval`.
    ///
    /// On a successful dequeue, `busy` is raised while the queue lock is
    /// still held.
    pub(crate) async fn pop(&self, interval: Duration, busy: &AtomicBool) -> PollOutcome {
        let mut rx = self.rx.lock().await;
        match timeout(interval, rx.recv()).await {
            Ok(Some(task)) => {
                busy.store(true, Ordering::SeqCst);
                PollOutcome::Task(task)
            }
            Ok(None) => PollOutcome::Closed,
            Err(_) => PollOutcome::TimedOut,
        }
    }

    /// Returns `true` if the queue is empty and `all_idle` holds, both
    /// observed under the queue lock.
    pub(crate) async fn is_empty_and<F>(&self, all_idle: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let rx = self.rx.lock().await;
        rx.is_empty() && all_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use std::collections::BTreeSet;

    use crate::core::{ScanReport, ScannerKind};

    fn dummy_task(target: &str) -> ScanTask {
        let id = TaskId::new(ScannerKind::Mock, target);
        let report = ScanReport::new(
            ScannerKind::Mock,
            target,
            json!({}),
            BTreeSet::new(),
            Vec::new(),
        );
        ScanTask {
            id,
            op: async move { Ok(ScanOutcome::Report(report)) }.boxed(),
        }
    }

    #[tokio::test]
    async fn test_pop_times_out_on_empty_queue() {
        let queue = TaskQueue::new();
        let busy = AtomicBool::new(false);
        let outcome = queue.consumer().pop(Duration::from_millis(10), &busy).await;
        assert!(matches!(outcome, PollOutcome::TimedOut));
        assert!(!busy.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_pop_sets_busy_on_dequeue() {
        let queue = TaskQueue::new();
        queue.push(dummy_task("https://example.com")).unwrap();
        let busy = AtomicBool::new(false);
        let outcome = queue.consumer().pop(Duration::from_millis(10), &busy).await;
        assert!(matches!(outcome, PollOutcome::Task(_)));
        assert!(busy.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_pop_observes_closed_channel() {
        let queue = TaskQueue::new();
        let consumer = queue.consumer();
        drop(queue);
        let busy = AtomicBool::new(false);
        let outcome = consumer.pop(Duration::from_secs(5), &busy).await;
        assert!(matches!(outcome, PollOutcome::Closed));
    }

    #[tokio::test]
    async fn test_emptiness_check() {
        let queue = TaskQueue::new();
        assert!(queue.is_empty_and(|| true).await);
        assert!(!queue.is_empty_and(|| false).await);

        queue.push(dummy_task("https://example.com")).unwrap();
        assert!(!queue.is_empty_and(|| true).await);
    }

    #[tokio::test]
    async fn test_queue_is_fifo_for_a_single_consumer() {
        let queue = TaskQueue::new();
        queue.push(dummy_task("first")).unwrap();
        queue.push(dummy_task("second")).unwrap();

        let busy = AtomicBool::new(false);
        let consumer = queue.consumer();
        for expected in ["first", "second"] {
            match consumer.pop(Duration::from_millis(10), &busy).await {
                PollOutcome::Task(task) => assert_eq!(task.id.target, expected),
                _ => panic!("expected a task"),
            }
        }
    }
}
