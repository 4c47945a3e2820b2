//! The worker loop: pull a task, run it, publish the result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::{ScanFailure, ScanOutcome, TaskResult};
use crate::orchestrator::queue::{PollOutcome, ScanTask, TaskConsumer};

/// One member of the worker pool.
///
/// A worker owns its run loop's join handle plus two flags: `busy`, written
/// only by the loop itself and read by the orchestrator for termination
/// detection, and `stop`, a set-once signal the loop observes whenever a
/// poll of the task queue times out. An in-flight job always finishes before
/// the loop exits; the job executor's own timeout is the only source of
/// forced cancellation.
pub(crate) struct Worker {
    name: String,
    busy: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawns a worker onto the current runtime.
    pub(crate) fn spawn(
        name: impl Into<String>,
        tasks: TaskConsumer,
        results: mpsc::UnboundedSender<TaskResult>,
        poll_interval: Duration,
    ) -> Self {
        let name = name.into();
        let busy = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_loop(
            name.clone(),
            tasks,
            results,
            poll_interval,
            Arc::clone(&busy),
            Arc::clone(&stop),
        ));
        Self {
            name,
            busy,
            stop,
            handle,
        }
    }

    /// Asks the worker to stop once its current poll cycle ends.
    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Returns `true` while a job is between dequeue and result publication.
    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Awaits the run loop's exit.
    pub(crate) async fn wait_until_stopped(self) {
        if let Err(err) = self.handle.await {
            tracing::error!(worker = %self.name, error = %err, "worker task failed");
        }
    }
}

async fn run_loop(
    name: String,
    tasks: TaskConsumer,
    results: mpsc::UnboundedSender<TaskResult>,
    poll_interval: Duration,
    busy: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
) {
    tracing::debug!(worker = %name, "worker started");
    loop {
        match tasks.pop(poll_interval, &busy).await {
            PollOutcome::TimedOut => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
            }
            PollOutcome::Closed => break,
            PollOutcome::Task(task) => {
                let ScanTask { id, op } = task;
                tracing::debug!(worker = %name, task = %id, "executing scan job");
                let started = std::time::Instant::now();
                let outcome = match op.await {
                    Ok(outcome) => outcome,
                    // A scanner returning Err here is a contract violation;
                    // fold it into a failure so the dequeue still yields
                    // exactly one result.
                    Err(err) => ScanOutcome::Failed(ScanFailure::new(
                        id.scanner,
                        id.target.as_str(),
                        err.to_string(),
                        String::new(),
                    )),
                };
                let delivered = results
                    .send(TaskResult::new(id, outcome, started.elapsed()))
                    .is_ok();
                // Busy stays raised until the result is on the queue;
                // termination detection relies on there being no gap.
                busy.store(false, Ordering::SeqCst);
                if !delivered {
                    tracing::warn!(worker = %name, "result receiver dropped; result discarded");
                }
            }
        }
    }
    tracing::debug!(worker = %name, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use std::collections::BTreeSet;

    use crate::core::{ScanError, ScanReport, ScannerKind, TaskId};
    use crate::orchestrator::queue::TaskQueue;

    fn task_with(
        target: &str,
        op: futures::future::BoxFuture<'static, Result<ScanOutcome, ScanError>>,
    ) -> ScanTask {
        ScanTask {
            id: TaskId::new(ScannerKind::Mock, target),
            op,
        }
    }

    fn clean_report(target: &str) -> ScanOutcome {
        ScanOutcome::Report(ScanReport::new(
            ScannerKind::Mock,
            target,
            json!({}),
            BTreeSet::new(),
            Vec::new(),
        ))
    }

    #[tokio::test]
    async fn test_worker_publishes_result_and_clears_busy() {
        let tasks = TaskQueue::new();
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let worker = Worker::spawn(
            "worker_1",
            tasks.consumer(),
            results_tx,
            Duration::from_millis(10),
        );

        let outcome = clean_report("https://example.com");
        tasks
            .push(task_with(
                "https://example.com",
                async move { Ok(outcome) }.boxed(),
            ))
            .unwrap();

        let result = results_rx.recv().await.expect("worker should publish");
        assert_eq!(result.id.target, "https://example.com");
        assert!(result.outcome.is_report());

        worker.request_stop();
        worker.wait_until_stopped().await;
    }

    #[tokio::test]
    async fn test_result_is_stamped_with_execution_time() {
        let tasks = TaskQueue::new();
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let worker = Worker::spawn(
            "worker_1",
            tasks.consumer(),
            results_tx,
            Duration::from_millis(10),
        );

        let before = chrono::Utc::now();
        let outcome = clean_report("https://example.com");
        tasks
            .push(task_with(
                "https://example.com",
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(outcome)
                }
                .boxed(),
            ))
            .unwrap();

        let result = results_rx.recv().await.expect("worker should publish");
        assert!(result.duration >= Duration::from_millis(50));
        assert!(result.completed_at >= before);
        assert!(result.started_at <= result.completed_at);

        worker.request_stop();
        worker.wait_until_stopped().await;
    }

    #[tokio::test]
    async fn test_scanner_error_is_folded_into_failure() {
        let tasks = TaskQueue::new();
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let worker = Worker::spawn(
            "worker_1",
            tasks.consumer(),
            results_tx,
            Duration::from_millis(10),
        );

        tasks
            .push(task_with(
                "https://example.com",
                async { Err(ScanError::QueueClosed) }.boxed(),
            ))
            .unwrap();

        let result = results_rx.recv().await.expect("worker should publish");
        assert!(result.outcome.is_failure());

        worker.request_stop();
        worker.wait_until_stopped().await;
    }

    #[tokio::test]
    async fn test_worker_exits_on_stop_signal() {
        let tasks = TaskQueue::new();
        let (results_tx, _results_rx) = mpsc::unbounded_channel();
        let worker = Worker::spawn("worker_1", tasks.consumer(), results_tx, Duration::from_millis(10));

        worker.request_stop();
        worker.wait_until_stopped().await;
    }

    #[tokio::test]
    async fn test_worker_exits_when_task_channel_closes() {
        let tasks = TaskQueue::new();
        let (results_tx, _results_rx) = mpsc::unbounded_channel();
        let worker = Worker::spawn(
            "worker_1",
            tasks.consumer(),
            results_tx,
            Duration::from_millis(10),
        );

        drop(tasks);
        // No stop signal needed; the closed channel ends the loop.
        worker.wait_until_stopped().await;
    }
}
