// =============================================================================
// OHLCV Candle Reduction
// =============================================================================
//
// Folds trades of one pair into fixed-width candles. Each pair owns at most
// one open candle; a trade for a later window closes it and starts the next.
//
// Fold semantics follow arrival order, not event time: `close` is the price
// of the most recently folded trade even if an earlier-stamped trade of the
// same window arrives late. A trade for a window that already closed is
// dropped. The fold is not idempotent: replaying a trade double-counts volume.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::market_data::emission::EmissionPolicy;
use crate::market_data::trade::Trade;
use crate::market_data::window::{self, Window};

/// A single OHLCV candle for `[window_start_ms, window_end_ms)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub pair: String,
    pub window_start_ms: i64,
    pub window_end_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Event time of the most recently folded trade.
    pub timestamp_ms: i64,
    pub trade_count: u64,
}

impl Candle {
    pub fn window(&self) -> Window {
        Window {
            start_ms: self.window_start_ms,
            end_ms: self.window_end_ms,
        }
    }

    /// Both window bounds match.
    pub fn same_window(&self, other: &Candle) -> bool {
        self.window_start_ms == other.window_start_ms && self.window_end_ms == other.window_end_ms
    }

    /// OHLCV invariants.
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
            && self.window_end_ms > self.window_start_ms
    }
}

/// Stateless init/fold over trades for a fixed window width.
#[derive(Debug, Clone, Copy)]
pub struct CandleReducer {
    width_ms: i64,
}

impl CandleReducer {
    pub fn new(width_ms: i64) -> Self {
        Self { width_ms }
    }

    pub fn width_ms(&self) -> i64 {
        self.width_ms
    }

    /// `None` when the trade's window cannot be represented.
    pub fn window_of(&self, trade: &Trade) -> Option<Window> {
        window::assign(trade.timestamp_ms, self.width_ms)
    }

    /// Start a candle from the first trade of a window.
    pub fn init(&self, trade: &Trade) -> Option<Candle> {
        self.window_of(trade).map(|window| self.start(trade, window))
    }

    fn start(&self, trade: &Trade, window: Window) -> Candle {
        Candle {
            pair: trade.pair.clone(),
            window_start_ms: window.start_ms,
            window_end_ms: window.end_ms,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: trade.volume,
            timestamp_ms: trade.timestamp_ms,
            trade_count: 1,
        }
    }

    /// Fold `trade` into `candle`. The window is left untouched; callers
    /// decide whether the trade belongs here.
    pub fn fold(&self, mut candle: Candle, trade: &Trade) -> Candle {
        candle.high = candle.high.max(trade.price);
        candle.low = candle.low.min(trade.price);
        candle.close = trade.price;
        candle.volume += trade.volume;
        candle.timestamp_ms = trade.timestamp_ms;
        candle.trade_count += 1;
        candle
    }
}

/// Per-pair open candle plus the emission decision for each trade.
#[derive(Debug)]
pub struct CandleAggregator {
    reducer: CandleReducer,
    policy: EmissionPolicy,
    open: Option<Candle>,
}

impl CandleAggregator {
    pub fn new(reducer: CandleReducer, policy: EmissionPolicy) -> Self {
        Self {
            reducer,
            policy,
            open: None,
        }
    }

    /// The live, not yet closed candle.
    pub fn open_candle(&self) -> Option<&Candle> {
        self.open.as_ref()
    }

    /// Apply one trade and return the candle to emit downstream, if any.
    ///
    /// Trades whose window cannot be represented, or whose window is already
    /// closed for this pair, are dropped.
    pub fn on_trade(&mut self, trade: &Trade) -> Option<Candle> {
        let Some(window) = self.reducer.window_of(trade) else {
            warn!(
                pair = %trade.pair,
                timestamp_ms = trade.timestamp_ms,
                width_ms = self.reducer.width_ms(),
                "dropping trade with out-of-range timestamp"
            );
            return None;
        };

        let (current, closed) = match self.open.take() {
            None => (self.reducer.start(trade, window), None),
            Some(open) if window.start_ms > open.window_start_ms => {
                (self.reducer.start(trade, window), Some(open))
            }
            Some(open) if window.start_ms < open.window_start_ms => {
                warn!(
                    pair = %trade.pair,
                    trade_window = %window,
                    open_window = %open.window(),
                    "dropping late trade for a closed window"
                );
                self.open = Some(open);
                return None;
            }
            Some(open) => (self.reducer.fold(open, trade), None),
        };

        let emitted = match closed {
            Some(closed) => self.policy.on_close(closed),
            None => None,
        };
        let emitted = emitted.or_else(|| self.policy.on_update(&current));

        self.open = Some(current);
        emitted
    }
}
