// =============================================================================
// Snapshot Sinks
// =============================================================================
//
// Downstream contract for indicator snapshots. A sink either accepts a whole
// batch or classifies its failure:
//
//   Retryable -> transient overload; wait `retry_after`, resend the same batch
//   Fatal     -> data/format or unexpected failure; the shard stops
//
// `BatchingSink` buffers snapshots per shard and owns the retry loop.
// =============================================================================

pub mod writers;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::pipeline::indicators::IndicatorSnapshot;

pub use writers::{AnySink, JsonLinesSink, StdoutSink};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkError {
    #[error("sink overloaded on {topic}/{partition}, retry after {retry_after:?}")]
    Retryable {
        retry_after: Duration,
        topic: String,
        partition: usize,
    },

    #[error("fatal sink error on {topic}/{partition}: {reason}")]
    Fatal {
        topic: String,
        partition: usize,
        reason: String,
    },
}

impl SinkError {
    pub fn fatal(batch: &SinkBatch, reason: impl Into<String>) -> Self {
        Self::Fatal {
            topic: batch.topic.clone(),
            partition: batch.partition,
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

/// One unit of delivery: records bound for a topic partition.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkBatch {
    pub topic: String,
    /// Shard index of the producing worker.
    pub partition: usize,
    pub records: Vec<IndicatorSnapshot>,
}

/// A destination that accepts whole batches.
pub trait SnapshotSink: Send {
    fn write(&mut self, batch: &SinkBatch) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Accumulates snapshots and delivers them in batches with bounded retries.
pub struct BatchingSink<S> {
    inner: S,
    topic: String,
    partition: usize,
    batch_size: usize,
    max_retries: u32,
    pending: Vec<IndicatorSnapshot>,
    delivered: u64,
}

impl<S: SnapshotSink> BatchingSink<S> {
    pub fn new(
        inner: S,
        topic: impl Into<String>,
        partition: usize,
        batch_size: usize,
        max_retries: u32,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            inner,
            topic: topic.into(),
            partition,
            batch_size,
            max_retries,
            pending: Vec::with_capacity(batch_size),
            delivered: 0,
        }
    }

    /// Queue one snapshot, flushing when the batch is full.
    pub async fn push(&mut self, snapshot: IndicatorSnapshot) -> Result<(), SinkError> {
        self.pending.push(snapshot);
        if self.pending.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Deliver everything pending. On `Retryable` the same batch is resent
    /// after the advised delay, at most `max_retries` times.
    pub async fn flush(&mut self) -> Result<(), SinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let batch = SinkBatch {
            topic: self.topic.clone(),
            partition: self.partition,
            records: std::mem::take(&mut self.pending),
        };

        let mut retries = 0;
        loop {
            match self.inner.write(&batch).await {
                Ok(()) => {
                    self.delivered += batch.records.len() as u64;
                    debug!(
                        topic = %batch.topic,
                        partition = batch.partition,
                        records = batch.records.len(),
                        retries,
                        "batch delivered"
                    );
                    return Ok(());
                }
                Err(SinkError::Retryable { retry_after, .. }) if retries < self.max_retries => {
                    retries += 1;
                    warn!(
                        topic = %batch.topic,
                        partition = batch.partition,
                        retry_after_ms = retry_after.as_millis() as u64,
                        attempt = retries,
                        max_retries = self.max_retries,
                        "sink overloaded, pausing shard"
                    );
                    tokio::time::sleep(retry_after).await;
                }
                Err(SinkError::Retryable { .. }) => {
                    return Err(SinkError::fatal(
                        &batch,
                        format!("still overloaded after {} retries", self.max_retries),
                    ));
                }
                Err(fatal) => return Err(fatal),
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Records acknowledged by the inner sink so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}
