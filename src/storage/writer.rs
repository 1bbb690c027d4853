//! Single-writer append queue.
//!
//! One tokio task owns the store's write path. Callers submit entries over a
//! bounded channel and wait on a oneshot reply; requests are applied strictly
//! in submission order, each finishing before the next begins.

use crate::session::types::LogEntry;
use crate::storage::record_store::{RecordStore, StoreError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

/// Default number of queued appends before senders wait.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

enum WriterCommand {
    Append {
        entry: LogEntry,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Shutdown,
}

/// Cloneable handle to the writer task.
#[derive(Clone)]
pub struct AppendQueue {
    sender: mpsc::Sender<WriterCommand>,
    store: Arc<RecordStore>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for AppendQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppendQueue")
            .field("store", &self.store)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl AppendQueue {
    /// Start the writer task on the current runtime.
    pub fn spawn(store: RecordStore) -> Self {
        Self::with_capacity(store, DEFAULT_QUEUE_CAPACITY)
    }

    /// Start the writer task with a custom queue capacity.
    pub fn with_capacity(store: RecordStore, capacity: usize) -> Self {
        let store = Arc::new(store);
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(writer_loop(Arc::clone(&store), receiver));

        tracing::debug!(capacity, "Append writer started");

        Self {
            sender,
            store,
            task: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Queue an entry and wait until it is written or rejected.
    pub async fn append(&self, entry: LogEntry) -> Result<(), StoreError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(WriterCommand::Append { entry, reply })
            .await
            .map_err(|_| writer_stopped())?;

        response.await.map_err(|_| writer_stopped())?
    }

    /// Read the log directly. May not observe appends still in the queue.
    pub async fn read_all(&self) -> Result<Vec<LogEntry>, StoreError> {
        self.store.read_all().await
    }

    /// The underlying store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Finish everything queued so far, then stop the task.
    ///
    /// Requests submitted after this call fail with `BackendUnavailable`.
    pub async fn shutdown(&self) {
        // Already closed if the task exited
        let _ = self.sender.send(WriterCommand::Shutdown).await;

        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!("Append writer task failed: {}", e);
            }
        }
    }
}

fn writer_stopped() -> StoreError {
    StoreError::BackendUnavailable("append writer stopped".to_string())
}

async fn writer_loop(store: Arc<RecordStore>, mut receiver: mpsc::Receiver<WriterCommand>) {
    let mut processed: u64 = 0;

    while let Some(command) = receiver.recv().await {
        match command {
            WriterCommand::Append { entry, reply } => {
                let result = store.append(&entry).await;
                if let Err(e) = &result {
                    tracing::warn!(player = %entry.player_id, error = %e, "Queued append failed");
                }
                processed += 1;
                // Caller may have given up waiting
                let _ = reply.send(result);
            }
            WriterCommand::Shutdown => break,
        }
    }

    tracing::info!(processed, "Append writer stopped");
}
