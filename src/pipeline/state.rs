// =============================================================================
// Sharded per-pair state
// =============================================================================
//
// Pairs are hashed onto a fixed number of shards. Each shard owns the open
// candle of every pair routed to it plus those pairs' histories, behind its
// own mutex. There is no lock spanning shards.
// =============================================================================

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::market_data::{
    Candle, CandleAggregator, CandleHistoryStore, CandleReducer, EmissionPolicy, HistoryPhase,
    Trade,
};
use crate::pipeline::indicators::{IndicatorPipeline, IndicatorSnapshot};

/// Per-shard state: one aggregator per pair and the shard's history store.
pub struct ShardState {
    aggregators: HashMap<String, CandleAggregator>,
    history: CandleHistoryStore,
}

impl ShardState {
    fn new(max_candles: usize) -> Self {
        Self {
            aggregators: HashMap::new(),
            history: CandleHistoryStore::new(max_candles),
        }
    }

    /// Fold, emit, record, compute: one trade, start to finish.
    fn process(
        &mut self,
        trade: &Trade,
        reducer: CandleReducer,
        policy: EmissionPolicy,
        pipeline: &IndicatorPipeline,
    ) -> Option<IndicatorSnapshot> {
        let candle = self
            .aggregators
            .entry(trade.pair.clone())
            .or_insert_with(|| CandleAggregator::new(reducer, policy))
            .on_trade(trade)?;
        debug_assert!(candle.is_valid(), "reducer produced an invalid candle");

        debug!(
            pair = %candle.pair,
            window = %candle.window(),
            open = candle.open,
            high = candle.high,
            low = candle.low,
            close = candle.close,
            volume = candle.volume,
            trades = candle.trade_count,
            "candle emitted"
        );

        if !self.history.update(candle.clone()).is_applied() {
            return None;
        }

        let buffer = self.history.get(&candle.pair)?;
        let snapshot = pipeline.compute(&candle, buffer);
        trace!(pair = %candle.pair, snapshot = ?snapshot.indicators, "indicator snapshot");
        Some(snapshot)
    }
}

pub struct ShardedState {
    shards: Vec<Mutex<ShardState>>,
    reducer: CandleReducer,
    policy: EmissionPolicy,
}

impl ShardedState {
    /// `shard_count` is clamped to at least one shard.
    pub fn new(
        shard_count: usize,
        reducer: CandleReducer,
        policy: EmissionPolicy,
        max_candles: usize,
    ) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(ShardState::new(max_candles)))
            .collect();
        Self {
            shards,
            reducer,
            policy,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Stable shard index for `pair` (FNV-1a, identical across runs).
    pub fn shard_for(&self, pair: &str) -> usize {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in pair.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (hash % self.shards.len() as u64) as usize
    }

    /// Process one trade on its pair's shard. Returns the snapshot to send
    /// downstream, if the trade caused an emission.
    pub fn process(&self, trade: &Trade, pipeline: &IndicatorPipeline) -> Option<IndicatorSnapshot> {
        let shard = self.shard_for(&trade.pair);
        self.shards[shard]
            .lock()
            .process(trade, self.reducer, self.policy, pipeline)
    }

    /// Ordered copy of a pair's history.
    pub fn history(&self, pair: &str) -> Vec<Candle> {
        self.shards[self.shard_for(pair)].lock().history.snapshot(pair)
    }

    pub fn phase(&self, pair: &str) -> HistoryPhase {
        self.shards[self.shard_for(pair)].lock().history.phase(pair)
    }

    /// The in-progress candle for `pair`, if any.
    pub fn open_candle(&self, pair: &str) -> Option<Candle> {
        self.shards[self.shard_for(pair)]
            .lock()
            .aggregators
            .get(pair)
            .and_then(|a| a.open_candle().cloned())
    }

    /// Pairs with history, per shard.
    pub fn pairs_per_shard(&self) -> Vec<usize> {
        self.shards
            .iter()
            .map(|s| s.lock().history.pair_count())
            .collect()
    }
}
