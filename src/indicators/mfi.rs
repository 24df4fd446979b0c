// =============================================================================
// Money Flow Index (MFI)
// =============================================================================
//
// Volume-weighted RSI over the typical price:
//   tp   = (H + L + C) / 3
//   flow = tp * volume, positive when tp rises, negative when it falls
//   MFI  = 100 - 100 / (1 + sum(positive) / sum(negative))   over `period`
//
// Needs `period + 1` bars.
// =============================================================================

pub fn calculate_mfi(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    volumes: &[f64],
    period: usize,
) -> Option<f64> {
    let n = highs
        .len()
        .min(lows.len())
        .min(closes.len())
        .min(volumes.len());
    if period == 0 || n < period + 1 {
        return None;
    }

    let typical = |i: usize| (highs[i] + lows[i] + closes[i]) / 3.0;

    let (mut positive, mut negative) = (0.0_f64, 0.0_f64);
    for i in n - period..n {
        let tp = typical(i);
        let prev = typical(i - 1);
        let flow = tp * volumes[i];
        if tp > prev {
            positive += flow;
        } else if tp < prev {
            negative += flow;
        }
    }

    let mfi = if positive == 0.0 && negative == 0.0 {
        50.0
    } else if negative == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + positive / negative)
    };

    mfi.is_finite().then_some(mfi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize, step: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * step).collect();
        let highs = closes.iter().map(|c| c + 1.0).collect();
        let lows = closes.iter().map(|c| c - 1.0).collect();
        (highs, lows, closes, vec![10.0; n])
    }

    #[test]
    fn rising_prices_give_100() {
        let (h, l, c, v) = series(11, 1.0);
        assert_eq!(calculate_mfi(&h, &l, &c, &v, 10), Some(100.0));
    }

    #[test]
    fn falling_prices_give_0() {
        let (h, l, c, v) = series(11, -1.0);
        assert!(calculate_mfi(&h, &l, &c, &v, 10).unwrap().abs() < 1e-10);
    }

    #[test]
    fn flat_prices_give_50() {
        let (h, l, c, v) = series(11, 0.0);
        assert_eq!(calculate_mfi(&h, &l, &c, &v, 10), Some(50.0));
    }

    #[test]
    fn needs_period_plus_one() {
        let (h, l, c, v) = series(10, 1.0);
        assert!(calculate_mfi(&h, &l, &c, &v, 10).is_none());
    }

    #[test]
    fn mixed_flow_in_range() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 0.5).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 0.5).collect();
        let volumes: Vec<f64> = (0..30).map(|i| 1.0 + (i % 4) as f64).collect();
        let mfi = calculate_mfi(&highs, &lows, &closes, &volumes, 10).unwrap();
        assert!(mfi > 0.0 && mfi < 100.0, "MFI {mfi}");
    }
}
