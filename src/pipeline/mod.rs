// =============================================================================
// Candle / indicator pipeline
// =============================================================================
//
//   Trade -> ShardedState (fold, emit, history) -> IndicatorPipeline
//         -> IndicatorSnapshot -> BatchingSink
//
// `worker` drives one shard from a bounded channel.
// =============================================================================

pub mod indicators;
pub mod state;
pub mod worker;

pub use indicators::{IndicatorPipeline, IndicatorSet, IndicatorSnapshot};
pub use state::ShardedState;
pub use worker::{ShardWorker, WorkerStats};
