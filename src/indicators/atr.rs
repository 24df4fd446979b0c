// =============================================================================
// Average True Range (ATR), Wilder's smoothing
// =============================================================================
//
//   TR    = max(H - L, |H - prevClose|, |L - prevClose|)
//   ATR_0 = SMA of the first `period` TR values
//   ATR_t = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Needs `period + 1` bars (each TR needs the previous close).
// =============================================================================

/// True range of each bar against its predecessor (`len - 1` values).
///
/// `f64::max` swallows NaN, so non-finite inputs are mapped to NaN
/// explicitly to keep them visible to the callers' finiteness checks.
pub(crate) fn true_ranges(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let n = highs.len().min(lows.len()).min(closes.len());
    (1..n)
        .map(|i| {
            let (high, low, prev_close) = (highs[i], lows[i], closes[i - 1]);
            if !(high.is_finite() && low.is_finite() && prev_close.is_finite()) {
                return f64::NAN;
            }
            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        })
        .collect()
}

/// Most recent ATR over parallel high/low/close slices (oldest first).
///
/// `None` when `period` is zero, fewer than `period + 1` bars are supplied,
/// or any intermediate value is non-finite.
pub fn calculate_atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }

    let tr_values = true_ranges(highs, lows, closes);
    if tr_values.len() < period {
        return None;
    }

    let period_f = period as f64;
    let mut atr = tr_values[..period].iter().sum::<f64>() / period_f;
    if !atr.is_finite() {
        return None;
    }

    for &tr in &tr_values[period..] {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            return None;
        }
    }

    Some(atr)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parallel slices from `(high, low, close)` triples.
    fn split(bars: &[(f64, f64, f64)]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            bars.iter().map(|b| b.0).collect(),
            bars.iter().map(|b| b.1).collect(),
            bars.iter().map(|b| b.2).collect(),
        )
    }

    #[test]
    fn atr_period_zero() {
        let (h, l, c) = split(&[(105.0, 95.0, 102.0); 20]);
        assert!(calculate_atr(&h, &l, &c, 0).is_none());
    }

    #[test]
    fn atr_needs_period_plus_one_bars() {
        let bars = [
            (102.0, 98.0, 101.0),
            (104.0, 99.0, 103.0),
            (106.0, 100.0, 105.0),
            (108.0, 102.0, 107.0),
        ];
        let (h, l, c) = split(&bars);
        assert!(calculate_atr(&h, &l, &c, 3).is_some());
        assert!(calculate_atr(&h[..3], &l[..3], &c[..3], 3).is_none());
    }

    #[test]
    fn atr_constant_range() {
        let bars: Vec<(f64, f64, f64)> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                (base + 5.0, base - 5.0, base)
            })
            .collect();
        let (h, l, c) = split(&bars);
        let atr = calculate_atr(&h, &l, &c, 14).unwrap();
        assert!((atr - 10.0).abs() < 1.0, "expected ATR near 10.0, got {atr}");
    }

    #[test]
    fn atr_true_range_uses_prev_close() {
        let bars = [
            (105.0, 95.0, 95.0),
            (115.0, 108.0, 112.0), // |115 - 95| = 20 > 7
            (118.0, 110.0, 115.0),
            (120.0, 113.0, 118.0),
        ];
        let (h, l, c) = split(&bars);
        let atr = calculate_atr(&h, &l, &c, 3).unwrap();
        assert!(atr > 7.0, "ATR should reflect the gap, got {atr}");
    }

    #[test]
    fn atr_nan_returns_none() {
        let bars = [
            (105.0, 95.0, 100.0),
            (f64::NAN, 95.0, 100.0),
            (105.0, 95.0, 100.0),
            (105.0, 95.0, 100.0),
        ];
        let (h, l, c) = split(&bars);
        assert!(calculate_atr(&h, &l, &c, 3).is_none());
    }
}
