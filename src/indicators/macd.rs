// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   macd   = EMA(close, fast) - EMA(close, slow)
//   signal = EMA(macd, signal_period)
//   hist   = macd - signal
//
// Needs `max(fast, slow) + signal - 1` closes.
// =============================================================================

use super::ema::calculate_ema;

/// Latest MACD line, signal line and histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Option<MacdResult> {
    if fast == 0 || slow == 0 || signal == 0 {
        return None;
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);
    let start = fast.max(slow) - 1;
    if closes.len() <= start {
        return None;
    }

    // Align both series on input indices `start..`.
    let fast_offset = start + 1 - fast;
    let slow_offset = start + 1 - slow;
    let line: Vec<f64> = (0..closes.len() - start)
        .map_while(|i| {
            let f = fast_ema.get(fast_offset + i)?;
            let s = slow_ema.get(slow_offset + i)?;
            Some(f - s)
        })
        .collect();

    let signal_series = calculate_ema(&line, signal);
    let macd = *line.last()?;
    let signal = *signal_series.last()?;
    let histogram = macd - signal;

    histogram.is_finite().then_some(MacdResult {
        macd,
        signal,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_length() {
        // slow 24 + signal 9 - 1 = 32
        let closes: Vec<f64> = (1..=32).map(|x| x as f64).collect();
        assert!(calculate_macd(&closes, 10, 24, 9).is_some());
        assert!(calculate_macd(&closes[..31], 10, 24, 9).is_none());
    }

    #[test]
    fn constant_series_is_flat() {
        let r = calculate_macd(&[50.0; 60], 10, 24, 9).unwrap();
        assert!(r.macd.abs() < 1e-10);
        assert!(r.signal.abs() < 1e-10);
        assert!(r.histogram.abs() < 1e-10);
    }

    #[test]
    fn uptrend_has_positive_macd() {
        let closes: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let r = calculate_macd(&closes, 12, 26, 9).unwrap();
        assert!(r.macd > 0.0);
        assert!((r.histogram - (r.macd - r.signal)).abs() < 1e-12);
    }

    #[test]
    fn zero_period_rejected() {
        assert!(calculate_macd(&[1.0; 50], 0, 26, 9).is_none());
    }
}
