use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tracing::{debug, warn};

use crate::market_data::candle::Candle;

// ---------------------------------------------------------------------------
// HistoryBuffer -- bounded ring of emitted candles for one pair
// ---------------------------------------------------------------------------

/// What an `update` did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// New window pushed to the back, nothing evicted.
    Appended,
    /// Same window as the newest entry; replaced in place.
    Replaced,
    /// New window pushed to the back and the oldest entry dropped.
    Evicted,
    /// Window starts before the newest entry; the buffer was left unchanged.
    RejectedOutOfOrder,
}

impl UpdateOutcome {
    /// Whether the buffer now reflects the candle.
    pub fn is_applied(self) -> bool {
        !matches!(self, Self::RejectedOutOfOrder)
    }
}

/// Lifecycle of a pair's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HistoryPhase {
    /// No candles yet.
    New,
    /// Fewer than `capacity` candles; updates append.
    Accumulating,
    /// Full; each new window evicts the oldest.
    Steady,
}

impl std::fmt::Display for HistoryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Accumulating => write!(f, "ACCUMULATING"),
            Self::Steady => write!(f, "STEADY"),
        }
    }
}

/// Ordered, bounded history of one pair's candles (oldest first).
///
/// Entries are strictly increasing by `window_start_ms`. Inserts and
/// replacements only ever touch the back; eviction only ever touches the
/// front. Gaps between windows (quiet pairs) are kept as-is, nothing is
/// interpolated.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl HistoryBuffer {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            candles: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Insert or replace the newest candle.
    ///
    /// * Empty buffer: append.
    /// * Same `[start, end)` as the newest entry: replace it (incomplete
    ///   emission sends many versions of one window).
    /// * Later window: append, then evict the oldest if over capacity.
    /// * Earlier window: rejected and logged.
    pub fn update(&mut self, candle: Candle) -> UpdateOutcome {
        if let Some(last) = self.candles.back_mut() {
            if candle.same_window(last) {
                *last = candle;
                return UpdateOutcome::Replaced;
            }
            if candle.window_start_ms < last.window_start_ms {
                warn!(
                    pair = %candle.pair,
                    window = %candle.window(),
                    newest = %last.window(),
                    "rejecting out-of-order candle for history"
                );
                return UpdateOutcome::RejectedOutOfOrder;
            }
        }

        self.candles.push_back(candle);

        if self.candles.len() > self.capacity {
            self.candles.pop_front();
            UpdateOutcome::Evicted
        } else {
            UpdateOutcome::Appended
        }
    }

    /// Ordered read-only view, oldest first.
    pub fn snapshot(&self) -> &VecDeque<Candle> {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn phase(&self) -> HistoryPhase {
        if self.candles.is_empty() {
            HistoryPhase::New
        } else if self.candles.len() < self.capacity {
            HistoryPhase::Accumulating
        } else {
            HistoryPhase::Steady
        }
    }
}

// ---------------------------------------------------------------------------
// CandleHistoryStore -- per-pair buffers owned by one shard
// ---------------------------------------------------------------------------

/// Per-pair history buffers sharing one capacity.
///
/// The store is not synchronised itself; it lives inside a shard whose owner
/// is the only writer (see `pipeline::state`).
#[derive(Debug)]
pub struct CandleHistoryStore {
    buffers: HashMap<String, HistoryBuffer>,
    max_candles: usize,
}

impl CandleHistoryStore {
    pub fn new(max_candles: usize) -> Self {
        Self {
            buffers: HashMap::new(),
            max_candles: max_candles.max(1),
        }
    }

    /// Route `candle` to its pair's buffer, creating it on first sight.
    pub fn update(&mut self, candle: Candle) -> UpdateOutcome {
        let max_candles = self.max_candles;
        let pair = candle.pair.clone();
        let buffer = self
            .buffers
            .entry(pair.clone())
            .or_insert_with(|| HistoryBuffer::new(max_candles));

        let outcome = buffer.update(candle);
        debug!(
            pair = %pair,
            outcome = ?outcome,
            len = buffer.len(),
            phase = %buffer.phase(),
            "candle history updated"
        );
        outcome
    }

    pub fn get(&self, pair: &str) -> Option<&HistoryBuffer> {
        self.buffers.get(pair)
    }

    /// Ordered copy of a pair's candles; empty for unknown pairs.
    pub fn snapshot(&self, pair: &str) -> Vec<Candle> {
        self.buffers
            .get(pair)
            .map(|b| b.snapshot().iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn phase(&self, pair: &str) -> HistoryPhase {
        self.buffers
            .get(pair)
            .map_or(HistoryPhase::New, HistoryBuffer::phase)
    }

    pub fn pair_count(&self) -> usize {
        self.buffers.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const W: i64 = 60_000;

    fn sample_candle(window_index: i64, close: f64) -> Candle {
        Candle {
            pair: "BTC/USD".into(),
            window_start_ms: window_index * W,
            window_end_ms: (window_index + 1) * W,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
            timestamp_ms: window_index * W,
            trade_count: 1,
        }
    }

    fn starts(buf: &HistoryBuffer) -> Vec<i64> {
        buf.snapshot().iter().map(|c| c.window_start_ms / W).collect()
    }

    #[test]
    fn ring_buffer_trimming() {
        let mut buf = HistoryBuffer::new(3);
        for i in 1..=5 {
            buf.update(sample_candle(i, 100.0 + i as f64));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(starts(&buf), vec![3, 4, 5]);
    }

    #[test]
    fn outcomes_follow_capacity() {
        let mut buf = HistoryBuffer::new(2);
        assert_eq!(buf.update(sample_candle(0, 1.0)), UpdateOutcome::Appended);
        assert_eq!(buf.update(sample_candle(1, 1.0)), UpdateOutcome::Appended);
        assert_eq!(buf.update(sample_candle(2, 1.0)), UpdateOutcome::Evicted);
    }

    #[test]
    fn same_window_replaces_without_eviction() {
        let mut buf = HistoryBuffer::new(2);
        buf.update(sample_candle(0, 50.0));
        buf.update(sample_candle(1, 50.0));
        assert_eq!(buf.phase(), HistoryPhase::Steady);

        let outcome = buf.update(sample_candle(1, 51.0));
        assert_eq!(outcome, UpdateOutcome::Replaced);
        assert_eq!(buf.len(), 2);
        assert_eq!(starts(&buf), vec![0, 1]);
        assert_eq!(buf.last().unwrap().close, 51.0);
    }

    #[test]
    fn out_of_order_window_is_rejected() {
        let mut buf = HistoryBuffer::new(5);
        buf.update(sample_candle(3, 1.0));
        let outcome = buf.update(sample_candle(2, 1.0));
        assert_eq!(outcome, UpdateOutcome::RejectedOutOfOrder);
        assert!(!outcome.is_applied());
        assert_eq!(starts(&buf), vec![3]);
    }

    #[test]
    fn gaps_are_kept_as_is() {
        let mut buf = HistoryBuffer::new(5);
        buf.update(sample_candle(0, 1.0));
        buf.update(sample_candle(4, 1.0));
        assert_eq!(starts(&buf), vec![0, 4]);
    }

    #[test]
    fn phases() {
        let mut buf = HistoryBuffer::new(2);
        assert_eq!(buf.phase(), HistoryPhase::New);
        buf.update(sample_candle(0, 1.0));
        assert_eq!(buf.phase(), HistoryPhase::Accumulating);
        buf.update(sample_candle(1, 1.0));
        assert_eq!(buf.phase(), HistoryPhase::Steady);
        buf.update(sample_candle(2, 1.0));
        assert_eq!(buf.phase(), HistoryPhase::Steady);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = HistoryBuffer::new(0);
        buf.update(sample_candle(0, 1.0));
        buf.update(sample_candle(1, 1.0));
        assert_eq!(buf.capacity(), 1);
        assert_eq!(starts(&buf), vec![1]);
    }

    #[test]
    fn store_keeps_pairs_apart() {
        let mut store = CandleHistoryStore::new(10);
        let mut eth = sample_candle(0, 10.0);
        eth.pair = "ETH/USD".into();

        store.update(sample_candle(0, 1.0));
        store.update(sample_candle(1, 1.0));
        store.update(eth);

        assert_eq!(store.pair_count(), 2);
        assert_eq!(store.snapshot("BTC/USD").len(), 2);
        assert_eq!(store.snapshot("ETH/USD").len(), 1);
        assert!(store.snapshot("XRP/USD").is_empty());
        assert_eq!(store.phase("XRP/USD"), HistoryPhase::New);
    }

    #[test]
    fn snapshot_reflects_latest_update() {
        let mut store = CandleHistoryStore::new(3);
        store.update(sample_candle(0, 1.0));
        store.update(sample_candle(0, 2.0));
        assert_eq!(store.snapshot("BTC/USD")[0].close, 2.0);
    }
}
