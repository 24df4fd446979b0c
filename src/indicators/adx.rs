// =============================================================================
// Average Directional Index (ADX)
// =============================================================================
//
// Trend strength regardless of direction:
//   1. +DM / -DM and True Range per bar transition.
//   2. Wilder-smooth the three series over `period`.
//   3. +DI = smoothed(+DM) / smoothed(TR) * 100, -DI likewise.
//   4. DX  = |+DI - -DI| / (+DI + -DI) * 100
//   5. ADX = Wilder-smoothed DX, seeded with the SMA of the first `period` DX.
//
// Needs `2 * period` bars.
// =============================================================================

use super::atr::true_ranges;

/// Most recent ADX over parallel high/low/close slices (oldest first).
pub fn calculate_adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }

    let n = highs.len().min(lows.len()).min(closes.len());
    if n < 2 * period {
        return None;
    }

    let period_f = period as f64;
    let tr_vals = true_ranges(highs, lows, closes);

    let (plus_dm, minus_dm): (Vec<f64>, Vec<f64>) = (1..n)
        .map(|i| {
            let up_move = highs[i] - highs[i - 1];
            let down_move = lows[i - 1] - lows[i];
            let pdm = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
            let mdm = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };
            (pdm, mdm)
        })
        .unzip();

    let mut smooth_plus: f64 = plus_dm[..period].iter().sum();
    let mut smooth_minus: f64 = minus_dm[..period].iter().sum();
    let mut smooth_tr: f64 = tr_vals[..period].iter().sum();

    let mut dx_values = Vec::with_capacity(tr_vals.len() - period + 1);
    dx_values.push(compute_dx(smooth_plus, smooth_minus, smooth_tr)?);

    for i in period..tr_vals.len() {
        smooth_plus = smooth_plus - smooth_plus / period_f + plus_dm[i];
        smooth_minus = smooth_minus - smooth_minus / period_f + minus_dm[i];
        smooth_tr = smooth_tr - smooth_tr / period_f + tr_vals[i];
        dx_values.push(compute_dx(smooth_plus, smooth_minus, smooth_tr)?);
    }

    if dx_values.len() < period {
        return None;
    }

    let mut adx = dx_values[..period].iter().sum::<f64>() / period_f;
    for &dx in &dx_values[period..] {
        adx = (adx * (period_f - 1.0) + dx) / period_f;
    }

    adx.is_finite().then_some(adx)
}

/// DX from smoothed +DM, -DM and TR. No range or no directional movement
/// gives 0.
fn compute_dx(smooth_plus_dm: f64, smooth_minus_dm: f64, smooth_tr: f64) -> Option<f64> {
    if !smooth_tr.is_finite() {
        return None;
    }
    if smooth_tr == 0.0 {
        return Some(0.0);
    }

    let plus_di = (smooth_plus_dm / smooth_tr) * 100.0;
    let minus_di = (smooth_minus_dm / smooth_tr) * 100.0;

    let di_sum = plus_di + minus_di;
    if di_sum == 0.0 {
        return Some(0.0);
    }

    let dx = ((plus_di - minus_di).abs() / di_sum) * 100.0;
    dx.is_finite().then_some(dx)
}
