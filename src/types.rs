// =============================================================================
// Shared types used across the candle-stream service
// =============================================================================

use serde::{Deserialize, Serialize};

/// Whether candles are emitted on every trade or only once their window
/// closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmissionMode {
    /// Emit the in-progress candle after every init/fold.
    Incomplete,
    /// Emit a candle once, when a trade for a later window arrives.
    Final,
}

impl Default for EmissionMode {
    fn default() -> Self {
        Self::Incomplete
    }
}

impl std::fmt::Display for EmissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incomplete => write!(f, "incomplete"),
            Self::Final => write!(f, "final"),
        }
    }
}

/// Where indicator snapshots are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Newline-delimited JSON appended to a file.
    Jsonl,
    /// Newline-delimited JSON on stdout.
    Stdout,
}

impl Default for SinkKind {
    fn default() -> Self {
        Self::Jsonl
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jsonl => write!(f, "jsonl"),
            Self::Stdout => write!(f, "stdout"),
        }
    }
}
