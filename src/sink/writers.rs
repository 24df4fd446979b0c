// Concrete sinks: newline-delimited JSON to a file or to stdout.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tracing::info;

use super::{SinkBatch, SinkError, SnapshotSink};

/// Serialise a batch as one JSON object per line.
fn encode(batch: &SinkBatch) -> Result<Vec<u8>, SinkError> {
    let mut buf = Vec::with_capacity(batch.records.len() * 512);
    for record in &batch.records {
        serde_json::to_writer(&mut buf, record)
            .map_err(|e| SinkError::fatal(batch, format!("encode failed: {e}")))?;
        buf.push(b'\n');
    }
    Ok(buf)
}

/// Timeouts and would-block conditions are overload; anything else is fatal.
fn classify(batch: &SinkBatch, err: std::io::Error, retry_after: Duration) -> SinkError {
    match err.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => SinkError::Retryable {
            retry_after,
            topic: batch.topic.clone(),
            partition: batch.partition,
        },
        _ => SinkError::fatal(batch, err.to_string()),
    }
}

/// Only a failure before the first byte is written may be retried. Once part
/// of the batch is out, resending it would duplicate or tear lines.
async fn write_lines<W>(out: &mut W, batch: &SinkBatch, retry_after: Duration) -> Result<(), SinkError>
where
    W: AsyncWrite + Unpin + Send,
{
    let buf = encode(batch)?;
    let mut written = 0;
    while written < buf.len() {
        match out.write(&buf[written..]).await {
            Ok(0) => {
                return Err(SinkError::fatal(
                    batch,
                    format!("sink closed after {written} of {} bytes", buf.len()),
                ))
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if written == 0 => return Err(classify(batch, e, retry_after)),
            Err(e) => {
                return Err(SinkError::fatal(
                    batch,
                    format!("partial write after {written} of {} bytes: {e}", buf.len()),
                ))
            }
        }
    }
    out.flush().await.map_err(|e| {
        SinkError::fatal(batch, format!("flush failed after batch was written: {e}"))
    })
}

/// Appends snapshots to a file.
pub struct JsonLinesSink {
    file: File,
    retry_after: Duration,
}

impl JsonLinesSink {
    pub async fn open(path: impl AsRef<Path>, retry_after: Duration) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open sink file {}", path.display()))?;
        info!(path = %path.display(), "jsonl sink opened");
        Ok(Self { file, retry_after })
    }
}

impl SnapshotSink for JsonLinesSink {
    async fn write(&mut self, batch: &SinkBatch) -> Result<(), SinkError> {
        write_lines(&mut self.file, batch, self.retry_after).await
    }
}

/// Writes snapshots to standard output.
pub struct StdoutSink {
    out: Stdout,
    retry_after: Duration,
}

impl StdoutSink {
    pub fn new(retry_after: Duration) -> Self {
        Self {
            out: tokio::io::stdout(),
            retry_after,
        }
    }
}

impl SnapshotSink for StdoutSink {
    async fn write(&mut self, batch: &SinkBatch) -> Result<(), SinkError> {
        write_lines(&mut self.out, batch, self.retry_after).await
    }
}

/// Sink selected from configuration at startup.
pub enum AnySink {
    Jsonl(JsonLinesSink),
    Stdout(StdoutSink),
}

impl SnapshotSink for AnySink {
    async fn write(&mut self, batch: &SinkBatch) -> Result<(), SinkError> {
        match self {
            Self::Jsonl(sink) => sink.write(batch).await,
            Self::Stdout(sink) => sink.write(batch).await,
        }
    }
}
