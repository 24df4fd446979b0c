// =============================================================================
// Rate of Change (ROC)
// =============================================================================
//
//   ROC = ((close - close_n) / close_n) * 100
//
// Needs `period + 1` closes. A zero reference close yields 0.

/// ROC series, one value per close starting at index `period`.
pub fn calculate_roc(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() <= period {
        return Vec::new();
    }

    (period..closes.len())
        .map(|i| {
            let prev = closes[i - period];
            if prev == 0.0 {
                0.0
            } else {
                ((closes[i] - prev) / prev) * 100.0
            }
        })
        .collect()
}

/// Most recent ROC value.
pub fn current_roc(closes: &[f64], period: usize) -> Option<f64> {
    calculate_roc(closes, period).last().copied()
}
