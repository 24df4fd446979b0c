pub mod candle;
pub mod candle_buffer;
pub mod emission;
pub mod mock_feed;
pub mod trade;
pub mod window;

// Re-export the core records for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::{Candle, CandleAggregator, CandleReducer};
pub use candle_buffer::{CandleHistoryStore, HistoryBuffer, HistoryPhase, UpdateOutcome};
pub use emission::EmissionPolicy;
pub use trade::Trade;
