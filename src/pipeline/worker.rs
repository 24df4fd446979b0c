// =============================================================================
// Shard Worker
// =============================================================================
//
// One tokio task per shard. Trades are handled strictly one after another:
// fold, emit, history update, indicators, then the next trade. While the sink
// is applying backpressure the worker does not read its channel, so the
// bounded queue fills and the producer waits.
// =============================================================================

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::market_data::Trade;
use crate::pipeline::indicators::IndicatorPipeline;
use crate::pipeline::state::ShardedState;
use crate::sink::{BatchingSink, SnapshotSink};

/// Counters reported when a worker finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub trades: u64,
    pub snapshots: u64,
}

pub struct ShardWorker<S> {
    shard: usize,
    state: Arc<ShardedState>,
    pipeline: Arc<IndicatorPipeline>,
    sink: BatchingSink<S>,
}

impl<S: SnapshotSink> ShardWorker<S> {
    pub fn new(
        shard: usize,
        state: Arc<ShardedState>,
        pipeline: Arc<IndicatorPipeline>,
        sink: BatchingSink<S>,
    ) -> Self {
        Self {
            shard,
            state,
            pipeline,
            sink,
        }
    }

    /// Consume trades until the channel closes, then flush what is pending.
    /// A fatal sink error stops the worker and is returned.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Trade>) -> Result<WorkerStats> {
        let mut stats = WorkerStats::default();
        info!(shard = self.shard, "shard worker started");

        while let Some(trade) = rx.recv().await {
            stats.trades += 1;

            let Some(snapshot) = self.state.process(&trade, &self.pipeline) else {
                continue;
            };
            stats.snapshots += 1;

            if let Err(e) = self.sink.push(snapshot).await {
                error!(shard = self.shard, error = %e, "sink failed, stopping shard");
                return Err(e.into());
            }
        }

        if let Err(e) = self.sink.flush().await {
            error!(shard = self.shard, error = %e, "final flush failed");
            return Err(e.into());
        }

        info!(
            shard = self.shard,
            trades = stats.trades,
            snapshots = stats.snapshots,
            delivered = self.sink.delivered(),
            "shard worker finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::NativeAnalytics;
    use crate::market_data::{CandleReducer, EmissionPolicy};
    use crate::runtime_config::IndicatorParams;
    use crate::sink::testing::ScriptedSink;
    use crate::sink::SinkError;
    use crate::types::EmissionMode;
    use std::time::Duration;

    fn worker(sink: ScriptedSink, batch_size: usize) -> (ShardWorker<ScriptedSink>, Arc<ShardedState>) {
        let state = Arc::new(ShardedState::new(
            1,
            CandleReducer::new(10_000),
            EmissionPolicy::new(EmissionMode::Incomplete),
            2,
        ));
        let pipeline = Arc::new(IndicatorPipeline::new(
            Arc::new(NativeAnalytics),
            IndicatorParams::default(),
        ));
        let sink = BatchingSink::new(sink, "technical_indicators", 0, batch_size, 3);
        (ShardWorker::new(0, state.clone(), pipeline, sink), state)
    }

    async fn feed(tx: mpsc::Sender<Trade>) {
        for trade in [
            Trade::new("X/Y", 10.0, 1.0, 0),
            Trade::new("X/Y", 12.0, 2.0, 3_000),
            Trade::new("X/Y", 9.0, 1.0, 11_000),
        ] {
            tx.send(trade).await.unwrap();
        }
    }

    #[tokio::test]
    async fn drains_channel_and_flushes_remainder() {
        let inner = ScriptedSink::default();
        let (worker, state) = worker(inner.clone(), 2);
        let (tx, rx) = mpsc::channel(8);

        feed(tx).await;
        let stats = worker.run(rx).await.unwrap();

        assert_eq!(stats, WorkerStats { trades: 3, snapshots: 3 });
        let accepted = inner.accepted.lock();
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].records.len(), 2);
        assert_eq!(accepted[1].records.len(), 1);
        assert_eq!(accepted[1].records[0].candle.close, 9.0);
        assert_eq!(state.history("X/Y").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn backpressure_pauses_then_recovers() {
        let inner = ScriptedSink::with_script(vec![ScriptedSink::retryable(30)]);
        let (worker, _) = worker(inner.clone(), 1);
        let (tx, rx) = mpsc::channel(8);

        feed(tx).await;
        let start = tokio::time::Instant::now();
        let stats = worker.run(rx).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(30));
        assert_eq!(stats.snapshots, 3);
        assert_eq!(*inner.attempts.lock(), 4);
        assert_eq!(inner.accepted.lock().len(), 3);
    }

    #[tokio::test]
    async fn fatal_sink_error_stops_worker() {
        let inner = ScriptedSink::with_script(vec![ScriptedSink::fatal()]);
        let (worker, _) = worker(inner.clone(), 1);
        let (tx, rx) = mpsc::channel(8);

        feed(tx).await;
        let err = worker.run(rx).await.unwrap_err();

        let sink_err = err.downcast_ref::<SinkError>().unwrap();
        assert!(matches!(sink_err, SinkError::Fatal { .. }));
        assert_eq!(*inner.attempts.lock(), 1);
    }
}
