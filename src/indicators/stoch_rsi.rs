// =============================================================================
// Stochastic RSI
// =============================================================================
//
// Applies the fast stochastic oscillator to the RSI series instead of price:
//
//   fastk = 100 * (rsi - min(rsi, k)) / (max(rsi, k) - min(rsi, k))
//   fastd = SMA(fastk, d)
//
// A flat RSI window (max == min) yields fastk = 0.
// Needs `period + fastk + fastd - 1` closes.
// =============================================================================

use super::rsi::calculate_rsi;
use super::sma::sma_series;

/// Latest `(fastk, fastd)` pair.
pub fn calculate_stoch_rsi(
    closes: &[f64],
    period: usize,
    fastk_period: usize,
    fastd_period: usize,
) -> Option<(f64, f64)> {
    if fastk_period == 0 || fastd_period == 0 {
        return None;
    }

    let rsi = calculate_rsi(closes, period);
    if rsi.len() < fastk_period + fastd_period - 1 {
        return None;
    }

    let fastk: Vec<f64> = rsi
        .windows(fastk_period)
        .map(|w| {
            let lo = w.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let last = w[w.len() - 1];
            if hi - lo == 0.0 {
                0.0
            } else {
                100.0 * (last - lo) / (hi - lo)
            }
        })
        .collect();

    let fastd = sma_series(&fastk, fastd_period);
    let k = *fastk.last()?;
    let d = *fastd.last()?;

    (k.is_finite() && d.is_finite()).then_some((k, d))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.9).sin() * 5.0 + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn minimum_length() {
        // period 10, k 5, d 3 -> 17 closes.
        let closes = zigzag(17);
        assert!(calculate_stoch_rsi(&closes, 10, 5, 3).is_some());
        assert!(calculate_stoch_rsi(&closes[..16], 10, 5, 3).is_none());
    }

    #[test]
    fn values_are_bounded() {
        let (k, d) = calculate_stoch_rsi(&zigzag(80), 10, 5, 3).unwrap();
        assert!((0.0..=100.0).contains(&k), "fastk {k}");
        assert!((0.0..=100.0).contains(&d), "fastd {d}");
    }

    #[test]
    fn flat_rsi_gives_zero() {
        let closes: Vec<f64> = (1..=40).map(|x| x as f64).collect();
        let (k, d) = calculate_stoch_rsi(&closes, 10, 5, 3).unwrap();
        assert_eq!(k, 0.0);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn zero_periods_are_rejected() {
        assert!(calculate_stoch_rsi(&zigzag(50), 10, 0, 3).is_none());
        assert!(calculate_stoch_rsi(&zigzag(50), 10, 5, 0).is_none());
    }
}
