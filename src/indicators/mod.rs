// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math over oldest-first slices. Functions
// return `Option`/empty series when the input is shorter than their lookback
// so callers never see a half-computed value.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stoch_rsi;
