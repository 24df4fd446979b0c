use crate::market_data::candle::Candle;
use crate::types::EmissionMode;

/// Decides which candle states leave the reducer.
///
/// `Incomplete` favours responsiveness: every init/fold is emitted, so the
/// final state of a window has already gone out by the time it closes.
/// `Final` emits each window exactly once, when the key's next window opens.
/// Closing is driven by key-local trade arrival only; a key that goes quiet
/// keeps its last window unemitted in `Final` mode.
#[derive(Debug, Clone, Copy)]
pub struct EmissionPolicy {
    mode: EmissionMode,
}

impl EmissionPolicy {
    pub fn new(mode: EmissionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> EmissionMode {
        self.mode
    }

    /// Called after the open candle was created or folded.
    pub fn on_update(&self, current: &Candle) -> Option<Candle> {
        match self.mode {
            EmissionMode::Incomplete => Some(current.clone()),
            EmissionMode::Final => None,
        }
    }

    /// Called when a trade for a strictly later window closes `closed`.
    pub fn on_close(&self, closed: Candle) -> Option<Candle> {
        match self.mode {
            EmissionMode::Incomplete => None,
            EmissionMode::Final => Some(closed),
        }
    }
}
