pub mod records;

use crate::logging::records::LogRecord;
use flume::{Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub queue_capacity: usize,
    pub worker_count: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            worker_count: 2,
        }
    }
}

/// Appends one JSON object per line to the interaction and feedback log
/// files. Keeps the bounded-queue-plus-worker-pool shape used elsewhere in
/// this codebase's background logging, but each worker now appends directly
/// to a JSONL file instead of batching into a database insert: every record
/// is one `write` of a newline-terminated line, relying on `O_APPEND`
/// atomicity. `log()` never blocks the caller and never fails the request.
pub struct InteractionLogger {
    sender: Sender<LogRecord>,
}

impl InteractionLogger {
    pub fn new(logs_directory: PathBuf, config: LoggerConfig) -> Arc<Self> {
        let (sender, receiver) = flume::bounded(config.queue_capacity);

        for worker_id in 0..config.worker_count.max(1) {
            let receiver: Receiver<LogRecord> = receiver.clone();
            let logs_directory = logs_directory.clone();
            tokio::spawn(async move {
                worker_loop(worker_id, receiver, logs_directory).await;
            });
        }

        Arc::new(Self { sender })
    }

    /// Fire-and-forget enqueue. A full queue drops the record with a
    /// warning rather than ever failing the caller's request.
    pub fn log(&self, record: LogRecord) {
        if self.sender.try_send(record).is_err() {
            tracing::warn!("interaction log queue is full, dropping record");
        }
    }
}

async fn worker_loop(worker_id: usize, receiver: Receiver<LogRecord>, logs_directory: PathBuf) {
    while let Ok(record) = receiver.recv_async().await {
        let file_name = record.file_name();
        let path = logs_directory.join(file_name);
        if let Err(e) = append_line(&path, &record).await {
            tracing::error!(worker_id, path = %path.display(), error = %e, "failed to write interaction log");
        }
    }
}

async fn append_line(path: &std::path::Path, record: &LogRecord) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    Ok(())
}
