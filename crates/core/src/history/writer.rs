use std::sync::Arc;

use tokio::sync::mpsc;

use super::{HistoryStore, QueryEventEnvelope, QueryEventHandle, QueryRecord};

/// Background task that receives query events and writes them to storage
pub struct HistoryWriter {
    rx: mpsc::Receiver<QueryEventEnvelope>,
    store: Arc<dyn HistoryStore>,
}

impl HistoryWriter {
    /// Create a new history writer
    pub fn new(rx: mpsc::Receiver<QueryEventEnvelope>, store: Arc<dyn HistoryStore>) -> Self {
        Self { rx, store }
    }

    /// Run the writer, consuming events until the channel is closed
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        tracing::info!("History writer started");

        while let Some(envelope) = self.rx.recv().await {
            let record = QueryRecord {
                id: 0, // Will be set by database
                timestamp: envelope.timestamp,
                indexer_id: envelope.event.indexer_id,
                indexer: envelope.event.indexer.clone(),
                search_type: envelope.event.search_type().to_string(),
                successful: envelope.event.successful(),
                data: envelope.event,
            };

            if let Err(e) = self.store.insert(&record) {
                tracing::error!("Failed to write query event: {}", e);
            }
        }

        tracing::info!("History writer shutting down");
    }
}

/// Create a complete history system
///
/// Returns:
/// - `QueryEventHandle` - for emitting events (clone this to share across tasks)
/// - `HistoryWriter` - spawn this as a background task with `tokio::spawn(writer.run())`
///
/// # Arguments
/// * `store` - The history store to write events to
/// * `buffer_size` - Size of the channel buffer (events are dropped when full)
pub fn create_history_system(
    store: Arc<dyn HistoryStore>,
    buffer_size: usize,
) -> (QueryEventHandle, HistoryWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let handle = QueryEventHandle::new(tx);
    let writer = HistoryWriter::new(rx, store);
    (handle, writer)
}
