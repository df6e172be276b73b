//! Asynchronous usage recorder
//!
//! Admitted keyed requests are reported here after the response is produced.
//! `record` is a plain channel send, so the request path never waits on log
//! or repository writes; the worker task does the bookkeeping. A failed write
//! is logged and discarded, it never surfaces to a request.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::api_key::ApiKeyRepository;
use crate::domain::usage::{UsageLogEntry, UsageLogRepository};

#[derive(Debug)]
pub struct UsageRecorder {
    sender: mpsc::UnboundedSender<UsageLogEntry>,
    worker: JoinHandle<()>,
}

impl UsageRecorder {
    /// Start the recorder worker. It appends each entry to the usage log and
    /// bumps the key's usage counter in the key repository.
    pub fn spawn(
        logs: Arc<dyn UsageLogRepository>,
        keys: Arc<dyn ApiKeyRepository>,
    ) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<UsageLogEntry>();

        let worker = tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                let key_id = entry.api_key_id.clone();

                if let Err(e) = logs.append(entry).await {
                    warn!(key_id = %key_id, "Discarding usage log entry: {}", e);
                }

                if let Err(e) = keys.record_usage(&key_id).await {
                    warn!(key_id = %key_id, "Failed to record key usage: {}", e);
                }
            }

            debug!("Usage recorder worker stopped");
        });

        Self { sender, worker }
    }

    /// Queue one entry without blocking. A closed channel is logged and the
    /// entry dropped.
    pub fn record(&self, entry: UsageLogEntry) {
        if self.sender.send(entry).is_err() {
            warn!("Usage recorder channel closed, entry discarded");
        }
    }

    /// Stop accepting entries and wait for the worker to drain the queue
    pub async fn shutdown(self) {
        drop(self.sender);

        if let Err(e) = self.worker.await {
            warn!("Usage recorder worker did not shut down cleanly: {}", e);
        }
    }
}
