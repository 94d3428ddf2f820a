//! Fire-and-forget write queue.
//!
//! Writes are executed in submission order by a single worker task. Callers
//! never see the outcome of an individual write: failures and panics are
//! logged and dropped. `flush` only waits for the queue to drain.
use std::panic::AssertUnwindSafe;

use anyhow::Result;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::completion::CompletionStore;
use crate::user_topics::{TopicDraft, UserTopicStore};

/// A mutation of the persistent store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCommand {
    Toggle { code: String, item: String },
    AddOrReplace(TopicDraft),
    AppendItem { code: String, text: String },
}

impl WriteCommand {
    fn name(&self) -> &'static str {
        match self {
            WriteCommand::Toggle { .. } => "toggle",
            WriteCommand::AddOrReplace(_) => "add_or_replace",
            WriteCommand::AppendItem { .. } => "append_item",
        }
    }
}

enum QueueMsg {
    Write(WriteCommand),
    Flush(oneshot::Sender<()>),
}

// ============================================================================
// WriteQueue
// ============================================================================

pub struct WriteQueue {
    tx: mpsc::UnboundedSender<QueueMsg>,
    worker: JoinHandle<()>,
}

impl WriteQueue {
    /// Spawn the worker. Must be called from within a Tokio runtime.
    pub fn spawn(completion: CompletionStore, topics: UserTopicStore) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, completion, topics));
        Self { tx, worker }
    }

    /// Queue a write and return immediately.
    pub fn submit(&self, command: WriteCommand) {
        tracing::trace!(command = command.name(), "Queued write");
        if let Err(e) = self.tx.send(QueueMsg::Write(command)) {
            tracing::warn!(error = %e, "Write queue closed, dropping write");
        }
    }

    /// Wait until every write submitted before this call has been executed.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(QueueMsg::Flush(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.await;
    }

    /// Drain pending writes and stop the worker.
    pub async fn shutdown(self) {
        let Self { tx, worker } = self;
        drop(tx);
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Write worker terminated abnormally");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<QueueMsg>,
    completion: CompletionStore,
    topics: UserTopicStore,
) {
    while let Some(msg) = rx.recv().await {
        let command = match msg {
            QueueMsg::Write(command) => command,
            QueueMsg::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
        };

        let name = command.name();
        match AssertUnwindSafe(apply(&completion, &topics, command))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(command = name, error = %e, "Write failed");
            }
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&'static str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(command = name, error = %msg, "Write panicked");
            }
        }
    }
    tracing::debug!("Write queue drained, worker exiting");
}

async fn apply(
    completion: &CompletionStore,
    topics: &UserTopicStore,
    command: WriteCommand,
) -> Result<()> {
    match command {
        WriteCommand::Toggle { code, item } => {
            completion.toggle(&code, &item).await?;
        }
        WriteCommand::AddOrReplace(draft) => {
            topics.add_or_replace(draft).await?;
        }
        WriteCommand::AppendItem { code, text } => {
            topics.append_item(&code, &text).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::completion_key;
    use crate::storage::Database;

    async fn test_queue() -> (Database, WriteQueue) {
        let db = Database::open(":memory:").await.unwrap();
        let queue = WriteQueue::spawn(
            CompletionStore::new(db.clone()),
            UserTopicStore::new(db.clone()),
        );
        (db, queue)
    }

    fn toggle(code: &str, item: &str) -> WriteCommand {
        WriteCommand::Toggle {
            code: code.to_string(),
            item: item.to_string(),
        }
    }

    #[tokio::test]
    async fn test_flush_waits_for_submitted_writes() {
        let (db, queue) = test_queue().await;
        queue.submit(toggle("A-1", "x"));
        queue.flush().await;

        assert!(db.get_flag(&completion_key("A-1", "x")).await.unwrap());
    }

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let (db, queue) = test_queue().await;
        queue.submit(WriteCommand::AddOrReplace(TopicDraft::default()));
        queue.submit(WriteCommand::AppendItem {
            code: "USER-001".to_string(),
            text: "third".to_string(),
        });
        queue.submit(WriteCommand::AddOrReplace(TopicDraft::default()));
        queue.flush().await;

        let topics = UserTopicStore::new(db).load().await.unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].code, "USER-001");
        assert_eq!(topics[0].items.len(), 3);
        assert_eq!(topics[1].code, "USER-002");
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let (db, queue) = test_queue().await;
        for _ in 0..3 {
            queue.submit(toggle("A-1", "x"));
        }
        queue.shutdown().await;

        assert!(db.get_flag(&completion_key("A-1", "x")).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_worker() {
        let (db, queue) = test_queue().await;
        db.pool.close().await;
        queue.submit(toggle("A-1", "x"));
        queue.flush().await;

        // Worker is still alive and acknowledges flushes
        queue.submit(toggle("A-1", "y"));
        queue.flush().await;
        assert!(!queue.worker.is_finished());
    }
}
