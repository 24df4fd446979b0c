// =============================================================================
// Tumbling Window Assignment
// =============================================================================
//
// Maps a trade's event time onto a fixed-width, half-open window
// `[start, start + width)`. Windows are contiguous and never overlap.
//
//   start = floor(timestamp_ms / width_ms) * width_ms
//   end   = start + width_ms
// =============================================================================

use serde::{Deserialize, Serialize};

/// A half-open `[start_ms, end_ms)` interval in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Window {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Window {
    /// Whether `timestamp_ms` falls inside this window.
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_ms && timestamp_ms < self.end_ms
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{})", self.start_ms, self.end_ms)
    }
}

/// Assign `timestamp_ms` to its tumbling window of width `width_ms`.
///
/// Uses Euclidean division so timestamps before the epoch still land in the
/// window that contains them. `None` when the window bounds do not fit in an
/// `i64` or `width_ms` is not positive.
pub fn assign(timestamp_ms: i64, width_ms: i64) -> Option<Window> {
    if width_ms <= 0 {
        return None;
    }
    let start_ms = timestamp_ms.div_euclid(width_ms).checked_mul(width_ms)?;
    let end_ms = start_ms.checked_add(width_ms)?;
    Some(Window { start_ms, end_ms })
}
