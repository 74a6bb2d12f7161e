//! # Edit Queue
//!
//! The single serialization point for every library mutation and status
//! refresh.
//!
//! ## Overview
//!
//! - [`EditQueue`] is the cloneable producer half. `enqueue` is synchronous
//!   and never blocks, so it can be called from any thread, including the
//!   audio thread of the voice client.
//! - [`EditQueueConsumer`] is the one consumer. Every `interval` it drains the
//!   whole backlog and applies it as one batch, then sleeps.
//!
//! ## Ordering
//!
//! Edits are taken in enqueue order (FIFO), so a rename never runs ahead of
//! the delete that frees its target. Long-running edits (downloads) are
//! handed to the executor's background pool through
//! [`EditExecutor::dispatch`]: the consumer moves on at once and the edit's
//! ticket resolves when the download finishes. A download therefore never
//! holds up status refreshes, and whoever needs finished downloads (the
//! directory swap) waits on their tickets before queueing.
//!
//! ## Failure handling
//!
//! A failing edit is logged and counted; the rest of the batch still runs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (queue, consumer) = EditQueue::channel(Duration::from_secs(5));
//! core_async::spawn(consumer.run(executor, shutdown.clone()));
//!
//! queue.enqueue(EditAction::RefreshStatus)?;
//! let ticket = queue.enqueue_tracked(EditAction::Delete { path })?;
//! let outcome = ticket.wait().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use core_async::sync::{mpsc, oneshot, CancellationToken};
use core_async::task::JoinHandle;
use core_async::time::{sleep, Duration};
use core_runtime::config::DEFAULT_EDIT_INTERVAL;
use core_runtime::events::{CoreEvent, EditEvent, EventBus};
use tracing::{debug, error, info, warn};

use crate::action::{EditAction, EditOutcome};
use crate::download::DownloadReport;
use crate::error::{Result, SyncError};

/// Applies edits. Implemented by the library executor.
#[async_trait]
pub trait EditExecutor: Send + Sync {
    async fn execute(&self, action: &EditAction) -> Result<EditOutcome>;

    /// Starts `action` on a background task when it is too slow to apply
    /// inline. `None` (the default) means [`execute`](Self::execute) applies
    /// it inside the batch.
    fn dispatch(&self, _action: &EditAction) -> Option<JoinHandle<Result<EditOutcome>>> {
        None
    }
}

struct QueuedEdit {
    action: EditAction,
    reply: Option<oneshot::Sender<Result<EditOutcome>>>,
}

/// Producer handle.
#[derive(Clone)]
pub struct EditQueue {
    sender: mpsc::UnboundedSender<QueuedEdit>,
}

impl EditQueue {
    /// Creates a queue draining every `interval`.
    pub fn channel(interval: Duration) -> (EditQueue, EditQueueConsumer) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            EditQueue { sender },
            EditQueueConsumer {
                receiver,
                interval,
                events: None,
            },
        )
    }

    pub fn with_default_interval() -> (EditQueue, EditQueueConsumer) {
        Self::channel(DEFAULT_EDIT_INTERVAL)
    }

    /// Queues `action` without waiting for its outcome.
    pub fn enqueue(&self, action: EditAction) -> Result<()> {
        debug!(action = %action, "Queued edit");
        self.sender
            .send(QueuedEdit {
                action,
                reply: None,
            })
            .map_err(|_| SyncError::QueueClosed)
    }

    /// Queues `action` and returns a ticket resolving to its outcome.
    pub fn enqueue_tracked(&self, action: EditAction) -> Result<EditTicket> {
        let (reply, receiver) = oneshot::channel();
        debug!(action = %action, "Queued tracked edit");
        self.sender
            .send(QueuedEdit {
                action,
                reply: Some(reply),
            })
            .map_err(|_| SyncError::QueueClosed)?;
        Ok(EditTicket { receiver })
    }

    /// True once the consumer is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Pending outcome of a tracked edit.
pub struct EditTicket {
    receiver: oneshot::Receiver<Result<EditOutcome>>,
}

impl EditTicket {
    /// Waits for the consumer to apply the edit.
    ///
    /// # Errors
    ///
    /// The executor's error, or [`SyncError::QueueClosed`] if the consumer
    /// stopped before reaching the edit.
    pub async fn wait(self) -> Result<EditOutcome> {
        self.receiver.await.map_err(|_| SyncError::QueueClosed)?
    }
}

/// Tally of one applied batch. Dispatched edits finish outside the batch and
/// are only counted as handed off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: u32,
    pub skipped: u32,
    pub deferred: u32,
    pub failed: u32,
    pub dispatched: u32,
}

impl BatchReport {
    pub fn total(&self) -> u32 {
        self.applied + self.skipped + self.deferred + self.failed + self.dispatched
    }

    fn record(&mut self, action: &EditAction, result: &Result<EditOutcome>) {
        match log_outcome(action, result) {
            Tally::Applied => self.applied += 1,
            Tally::Skipped => self.skipped += 1,
            Tally::Deferred => self.deferred += 1,
            Tally::Failed => self.failed += 1,
        }
    }
}

enum Tally {
    Applied,
    Skipped,
    Deferred,
    Failed,
}

fn log_outcome(action: &EditAction, result: &Result<EditOutcome>) -> Tally {
    match result {
        Ok(EditOutcome::Applied) => Tally::Applied,
        Ok(EditOutcome::Downloaded(DownloadReport::Downloaded { .. })) => {
            debug!(action = %action, "Download finished");
            Tally::Applied
        }
        Ok(EditOutcome::Skipped(reason)) => {
            debug!(action = %action, reason = %reason, "Edit skipped");
            Tally::Skipped
        }
        Ok(EditOutcome::Deferred(reason)) => {
            info!(action = %action, reason = %reason, "Edit deferred");
            Tally::Deferred
        }
        Ok(EditOutcome::Downloaded(DownloadReport::Failed { reason })) => {
            warn!(action = %action, reason = %reason, "Download failed");
            Tally::Failed
        }
        Err(e) => {
            error!(action = %action, error = %e, "Edit failed");
            Tally::Failed
        }
    }
}

/// The single consumer.
pub struct EditQueueConsumer {
    receiver: mpsc::UnboundedReceiver<QueuedEdit>,
    interval: Duration,
    events: Option<EventBus>,
}

impl EditQueueConsumer {
    /// Publishes batch results on `events`.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Drains and applies until `shutdown` fires or every producer is
    /// dropped. On shutdown the remaining backlog is applied once more.
    pub async fn run<E>(mut self, executor: Arc<E>, shutdown: CancellationToken)
    where
        E: EditExecutor + ?Sized,
    {
        info!(interval_ms = self.interval.as_millis() as u64, "Edit queue consumer started");

        loop {
            let (batch, disconnected) = self.drain();
            if !batch.is_empty() {
                self.apply_batch(executor.as_ref(), batch).await;
            }
            if disconnected {
                info!("All edit producers dropped, consumer stopping");
                return;
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    let (batch, _) = self.drain();
                    if !batch.is_empty() {
                        info!(pending = batch.len(), "Flushing edit backlog before shutdown");
                        self.apply_batch(executor.as_ref(), batch).await;
                    }
                    info!("Edit queue consumer stopped");
                    return;
                }
                _ = sleep(self.interval) => {}
            }
        }
    }

    /// Everything pending right now, plus whether the producers are gone.
    fn drain(&mut self) -> (Vec<QueuedEdit>, bool) {
        let mut batch = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(edit) => batch.push(edit),
                Err(mpsc::error::TryRecvError::Empty) => return (batch, false),
                Err(mpsc::error::TryRecvError::Disconnected) => return (batch, true),
            }
        }
    }

    async fn apply_batch<E>(&self, executor: &E, batch: Vec<QueuedEdit>) -> BatchReport
    where
        E: EditExecutor + ?Sized,
    {
        info!(count = batch.len(), "Processing queued edits");
        let mut report = BatchReport::default();

        for edit in batch {
            match executor.dispatch(&edit.action) {
                Some(task) => {
                    report.dispatched += 1;
                    self.follow(edit, task);
                }
                None => {
                    let result = executor.execute(&edit.action).await;
                    self.settle(edit, result, &mut report);
                }
            }
        }

        info!(
            applied = report.applied,
            skipped = report.skipped,
            deferred = report.deferred,
            failed = report.failed,
            dispatched = report.dispatched,
            "Edit batch applied"
        );
        self.emit(CoreEvent::Edit(EditEvent::BatchApplied {
            applied: report.applied,
            skipped: report.skipped,
            deferred: report.deferred,
            failed: report.failed,
        }));
        report
    }

    fn settle(&self, edit: QueuedEdit, result: Result<EditOutcome>, report: &mut BatchReport) {
        report.record(&edit.action, &result);
        finish(edit, result, self.events.as_ref());
    }

    /// Resolves a dispatched edit's ticket once its task ends.
    fn follow(&self, edit: QueuedEdit, task: JoinHandle<Result<EditOutcome>>) {
        debug!(action = %edit.action, "Edit dispatched to the background");
        let events = self.events.clone();
        core_async::spawn(async move {
            let result = task
                .await
                .unwrap_or_else(|e| Err(SyncError::Task(e.to_string())));
            log_outcome(&edit.action, &result);
            finish(edit, result, events.as_ref());
        });
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(events) = &self.events {
            events.emit(event).ok();
        }
    }
}

fn finish(edit: QueuedEdit, result: Result<EditOutcome>, events: Option<&EventBus>) {
    if let (Err(e), Some(events)) = (&result, events) {
        events
            .emit(CoreEvent::Edit(EditEvent::ActionFailed {
                action: edit.action.kind().to_string(),
                message: format!("{}: {}", edit.action, e),
            }))
            .ok();
    }
    if let Some(reply) = edit.reply {
        // The requester may have stopped waiting.
        let _ = reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingExecutor {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EditExecutor for RecordingExecutor {
        async fn execute(&self, action: &EditAction) -> Result<EditOutcome> {
            self.seen.lock().unwrap().push(action.to_string());
            match action {
                EditAction::Delete { path } if path.ends_with("broken") => {
                    Err(SyncError::Staging("disk on fire".to_string()))
                }
                _ => Ok(EditOutcome::Applied),
            }
        }
    }

    fn delete(name: &str) -> EditAction {
        EditAction::Delete {
            path: PathBuf::from(name),
        }
    }

    #[core_async::test]
    async fn test_batch_is_fifo_and_continues_after_failure() {
        let (queue, consumer) = EditQueue::channel(Duration::from_millis(10));
        let executor = Arc::new(RecordingExecutor::default());

        queue.enqueue(delete("a")).unwrap();
        queue.enqueue(delete("broken")).unwrap();
        queue.enqueue(delete("c")).unwrap();
        let batch = consumer_drain(consumer, executor.clone()).await;

        assert_eq!(
            *executor.seen.lock().unwrap(),
            vec!["delete a", "delete broken", "delete c"]
        );
        assert_eq!(batch.applied, 2);
        assert_eq!(batch.failed, 1);
    }

    async fn consumer_drain(
        mut consumer: EditQueueConsumer,
        executor: Arc<RecordingExecutor>,
    ) -> BatchReport {
        let (batch, _) = consumer.drain();
        consumer.apply_batch(executor.as_ref(), batch).await
    }

    #[core_async::test]
    async fn test_enqueue_after_consumer_dropped() {
        let (queue, consumer) = EditQueue::channel(Duration::from_secs(5));
        drop(consumer);

        assert!(queue.is_closed());
        assert!(matches!(
            queue.enqueue(EditAction::RefreshStatus),
            Err(SyncError::QueueClosed)
        ));
    }

    #[core_async::test]
    async fn test_ticket_reports_closed_queue() {
        let (queue, consumer) = EditQueue::channel(Duration::from_secs(5));
        let ticket = queue.enqueue_tracked(EditAction::RefreshStatus).unwrap();
        drop(consumer);

        assert!(matches!(ticket.wait().await, Err(SyncError::QueueClosed)));
    }

    #[test]
    fn test_batch_report_counts() {
        let mut report = BatchReport::default();
        let action = EditAction::RefreshStatus;
        report.record(&action, &Ok(EditOutcome::Applied));
        report.record(&action, &Ok(EditOutcome::Skipped("throttled".to_string())));
        report.record(&action, &Ok(EditOutcome::Deferred("playing".to_string())));
        report.record(
            &action,
            &Ok(EditOutcome::Downloaded(DownloadReport::Failed {
                reason: "no match".to_string(),
            })),
        );

        assert_eq!(
            report,
            BatchReport {
                applied: 1,
                skipped: 1,
                deferred: 1,
                failed: 1,
                dispatched: 0,
            }
        );
        assert_eq!(report.total(), 4);
    }
}
