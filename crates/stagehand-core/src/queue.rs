use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::item::{ItemOutcome, OperationResult, WorkItem};

/// Performs exactly one operation per call. Implementations convert
/// classified failures into `ItemOutcome::Failed`; an `Err` is an
/// unclassified error and aborts the whole batch.
pub trait OperationExecutor: Send {
    fn execute(&mut self, item: &WorkItem) -> Result<ItemOutcome>;
}

/// Presentation-layer callbacks. `item_completed` is delivered once per
/// enqueued item, in enqueue order; `batch_completed` once per batch, after
/// the last item.
pub trait BatchObserver {
    fn item_completed(&mut self, result: &OperationResult);
    fn batch_completed(&mut self, all_succeeded: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueState {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub all_succeeded: bool,
}

enum WorkerEvent {
    ItemDone(OperationResult),
    Fatal(anyhow::Error),
}

/// Sequential batch driver. Owns the pending queue for the duration of a
/// batch and guarantees one operation in flight at a time: the worker thread
/// never dispatches the next item before the previous item's
/// `item_completed` callback has returned on the driving thread.
#[derive(Debug, Default)]
pub struct QueueDriver {
    pending: VecDeque<WorkItem>,
    state: QueueState,
}

impl QueueDriver {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            state: QueueState::Idle,
        }
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn enqueue(&mut self, items: impl IntoIterator<Item = WorkItem>) -> Result<()> {
        if self.state == QueueState::Running {
            return Err(anyhow!("cannot enqueue items while a batch is running"));
        }
        self.pending.extend(items);
        Ok(())
    }

    /// Runs the queued batch to completion. Result callbacks are delivered
    /// on the calling thread, in enqueue order, while the executor blocks on
    /// a dedicated worker thread. Returns the aggregate summary, or the
    /// first unclassified executor error (in which case the batch is
    /// abandoned and no `batch_completed` callback is emitted).
    pub fn run<E, O>(&mut self, executor: E, observer: &mut O) -> Result<BatchSummary>
    where
        E: OperationExecutor + 'static,
        O: BatchObserver,
    {
        let total = self.pending.len();
        if total == 0 {
            observer.batch_completed(true);
            return Ok(BatchSummary {
                total: 0,
                succeeded: 0,
                failed: 0,
                all_succeeded: true,
            });
        }

        self.state = QueueState::Running;
        let queue = std::mem::take(&mut self.pending);
        let (events_tx, events_rx) = mpsc::channel();
        let (acks_tx, acks_rx) = mpsc::channel();
        let worker = thread::spawn(move || run_worker(queue, executor, events_tx, acks_rx));

        let mut succeeded = 0_usize;
        let mut failed = 0_usize;
        let mut all_succeeded = true;
        let mut fatal = None;

        while let Ok(event) = events_rx.recv() {
            match event {
                WorkerEvent::ItemDone(result) => {
                    if result.success {
                        succeeded += 1;
                    } else {
                        failed += 1;
                        all_succeeded = false;
                    }
                    observer.item_completed(&result);
                    // The worker holds the next item until this ack arrives.
                    let _ = acks_tx.send(());
                }
                WorkerEvent::Fatal(err) => {
                    fatal = Some(err);
                }
            }
        }

        worker
            .join()
            .map_err(|_| anyhow!("operation worker thread panicked"))?;
        self.state = QueueState::Idle;

        if let Some(err) = fatal {
            return Err(err).context("batch aborted by an unclassified executor error");
        }

        observer.batch_completed(all_succeeded);
        Ok(BatchSummary {
            total,
            succeeded,
            failed,
            all_succeeded,
        })
    }
}

fn run_worker<E: OperationExecutor>(
    mut queue: VecDeque<WorkItem>,
    mut executor: E,
    events: mpsc::Sender<WorkerEvent>,
    acks: mpsc::Receiver<()>,
) {
    while let Some(item) = queue.pop_front() {
        info!(
            identifier = %item.identifier,
            kind = item.kind.as_str(),
            "dispatching operation"
        );
        let event = match executor.execute(&item) {
            Ok(ItemOutcome::Succeeded) => WorkerEvent::ItemDone(OperationResult {
                identifier: item.identifier,
                success: true,
                detail: None,
            }),
            Ok(ItemOutcome::Failed(reason)) => WorkerEvent::ItemDone(OperationResult {
                identifier: item.identifier,
                success: false,
                detail: Some(reason.to_string()),
            }),
            Err(err) => {
                let _ = events.send(WorkerEvent::Fatal(err));
                return;
            }
        };
        if events.send(event).is_err() {
            return;
        }
        // Hold the next dispatch until the driving thread confirms the
        // result callback has been delivered.
        if acks.recv().is_err() {
            return;
        }
    }
}
