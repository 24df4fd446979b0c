// =============================================================================
// Indicator Analytics: the capability the indicator pipeline calls into
// =============================================================================
//
// `Analytics::compute` is a pure function of the indicator definition and the
// supplied oldest-first series. It has no hidden state and returns `None`
// when the series is shorter than the indicator's lookback.
//
// `NativeAnalytics` backs the trait with the math in `crate::indicators`.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::{adx, atr, bollinger, ema, macd, mfi, roc, rsi, sma, stoch_rsi};
use crate::market_data::Candle;

/// An indicator together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Indicator {
    Sma { period: usize },
    Ema { period: usize },
    VolumeEma { period: usize },
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, num_std: f64 },
    StochRsi { period: usize, fastk: usize, fastd: usize },
    Adx { period: usize },
    Atr { period: usize },
    Mfi { period: usize },
    Roc { period: usize },
}

impl Indicator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sma { .. } => "sma",
            Self::Ema { .. } => "ema",
            Self::VolumeEma { .. } => "volume_ema",
            Self::Rsi { .. } => "rsi",
            Self::Macd { .. } => "macd",
            Self::Bollinger { .. } => "bbands",
            Self::StochRsi { .. } => "stochrsi",
            Self::Adx { .. } => "adx",
            Self::Atr { .. } => "atr",
            Self::Mfi { .. } => "mfi",
            Self::Roc { .. } => "roc",
        }
    }

    /// Minimum number of candles before a value can be produced.
    pub fn lookback(&self) -> usize {
        match *self {
            Self::Sma { period }
            | Self::Ema { period }
            | Self::VolumeEma { period }
            | Self::Bollinger { period, .. } => period.max(1),
            Self::Rsi { period } | Self::Atr { period } | Self::Mfi { period } | Self::Roc { period } => {
                period + 1
            }
            Self::Macd { fast, slow, signal } => fast.max(slow) + signal.max(1) - 1,
            Self::StochRsi { period, fastk, fastd } => period + fastk.max(1) + fastd.max(1) - 1,
            Self::Adx { period } => 2 * period.max(1),
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(lookback={})", self.name(), self.lookback())
    }
}

/// Output shape of one indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Scalar(f64),
    Pair(f64, f64),
    Triple(f64, f64, f64),
}

impl IndicatorValue {
    pub fn scalar(self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn pair(self) -> Option<(f64, f64)> {
        match self {
            Self::Pair(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn triple(self) -> Option<(f64, f64, f64)> {
        match self {
            Self::Triple(a, b, c) => Some((a, b, c)),
            _ => None,
        }
    }
}

/// Parallel oldest-first series extracted from a candle history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl Series {
    pub fn from_candles<'a>(candles: impl IntoIterator<Item = &'a Candle>) -> Self {
        let mut series = Self::default();
        for c in candles {
            series.highs.push(c.high);
            series.lows.push(c.low);
            series.closes.push(c.close);
            series.volumes.push(c.volume);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Indicator computation capability.
pub trait Analytics: Send + Sync {
    fn compute(&self, indicator: &Indicator, series: &Series) -> Option<IndicatorValue>;
}

/// `Analytics` backed by the in-crate indicator math.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeAnalytics;

impl Analytics for NativeAnalytics {
    fn compute(&self, indicator: &Indicator, series: &Series) -> Option<IndicatorValue> {
        let Series {
            highs,
            lows,
            closes,
            volumes,
        } = series;

        match *indicator {
            Indicator::Sma { period } => sma::calculate_sma(closes, period).map(IndicatorValue::Scalar),
            Indicator::Ema { period } => ema::current_ema(closes, period).map(IndicatorValue::Scalar),
            Indicator::VolumeEma { period } => {
                ema::current_ema(volumes, period).map(IndicatorValue::Scalar)
            }
            Indicator::Rsi { period } => rsi::current_rsi(closes, period).map(IndicatorValue::Scalar),
            Indicator::Macd { fast, slow, signal } => macd::calculate_macd(closes, fast, slow, signal)
                .map(|m| IndicatorValue::Triple(m.macd, m.signal, m.histogram)),
            Indicator::Bollinger { period, num_std } => {
                bollinger::calculate_bollinger(closes, period, num_std)
                    .map(|b| IndicatorValue::Triple(b.upper, b.middle, b.lower))
            }
            Indicator::StochRsi { period, fastk, fastd } => {
                stoch_rsi::calculate_stoch_rsi(closes, period, fastk, fastd)
                    .map(|(k, d)| IndicatorValue::Pair(k, d))
            }
            Indicator::Adx { period } => {
                adx::calculate_adx(highs, lows, closes, period).map(IndicatorValue::Scalar)
            }
            Indicator::Atr { period } => {
                atr::calculate_atr(highs, lows, closes, period).map(IndicatorValue::Scalar)
            }
            Indicator::Mfi { period } => {
                mfi::calculate_mfi(highs, lows, closes, volumes, period).map(IndicatorValue::Scalar)
            }
            Indicator::Roc { period } => roc::current_roc(closes, period).map(IndicatorValue::Scalar),
        }
    }
}
