// =============================================================================
// Indicator Pipeline
// =============================================================================
//
// Recomputes every configured indicator from a pair's full history on each
// emitted candle. Nothing is carried between calls: the same history always
// yields the same snapshot.
//
// An indicator whose lookback exceeds the history length is `None` and the
// analytics capability is not consulted for it.
// =============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analytics::{Analytics, Indicator, IndicatorValue, Series};
use crate::market_data::{Candle, HistoryBuffer};
use crate::runtime_config::IndicatorParams;

/// Named indicator fields attached to every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi_9: Option<f64>,
    pub rsi_14: Option<f64>,
    pub rsi_21: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub bbands_upper: Option<f64>,
    pub bbands_middle: Option<f64>,
    pub bbands_lower: Option<f64>,
    pub stochrsi_fastk: Option<f64>,
    pub stochrsi_fastd: Option<f64>,
    pub adx: Option<f64>,
    pub volume_ema: Option<f64>,
    pub ichimoku_conv: Option<f64>,
    pub ichimoku_base: Option<f64>,
    pub ichimoku_span_a: Option<f64>,
    pub ichimoku_span_b: Option<f64>,
    pub mfi: Option<f64>,
    pub atr: Option<f64>,
    pub price_roc: Option<f64>,
    pub sma_7: Option<f64>,
    pub sma_14: Option<f64>,
    pub sma_21: Option<f64>,
}

/// Candle fields merged with the indicator set, as written downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    #[serde(flatten)]
    pub candle: Candle,
    #[serde(flatten)]
    pub indicators: IndicatorSet,
}

pub struct IndicatorPipeline {
    analytics: Arc<dyn Analytics>,
    params: IndicatorParams,
}

impl IndicatorPipeline {
    pub fn new(analytics: Arc<dyn Analytics>, params: IndicatorParams) -> Self {
        Self { analytics, params }
    }

    /// Snapshot for `candle` computed over `history` (which normally ends
    /// with `candle`).
    pub fn compute(&self, candle: &Candle, history: &HistoryBuffer) -> IndicatorSnapshot {
        let series = Series::from_candles(history.snapshot());
        let p = &self.params;

        let eval = |indicator: Indicator| -> Option<IndicatorValue> {
            if series.len() < indicator.lookback() {
                return None;
            }
            self.analytics.compute(&indicator, &series)
        };
        let scalar = |indicator: Indicator| eval(indicator).and_then(IndicatorValue::scalar);

        let mut set = IndicatorSet {
            rsi_9: scalar(Indicator::Rsi { period: 9 }),
            rsi_14: scalar(Indicator::Rsi { period: 14 }),
            rsi_21: scalar(Indicator::Rsi { period: 21 }),
            adx: scalar(Indicator::Adx { period: p.adx_period }),
            volume_ema: scalar(Indicator::VolumeEma {
                period: p.volume_ema_period,
            }),
            ichimoku_conv: scalar(Indicator::Ema {
                period: p.ichimoku_conversion,
            }),
            ichimoku_base: scalar(Indicator::Ema {
                period: p.ichimoku_base,
            }),
            ichimoku_span_b: scalar(Indicator::Ema {
                period: p.ichimoku_span_b,
            }),
            mfi: scalar(Indicator::Mfi { period: p.mfi_period }),
            atr: scalar(Indicator::Atr { period: p.atr_period }),
            price_roc: scalar(Indicator::Roc { period: p.roc_period }),
            sma_7: scalar(Indicator::Sma { period: 7 }),
            sma_14: scalar(Indicator::Sma { period: 14 }),
            sma_21: scalar(Indicator::Sma { period: 21 }),
            ..IndicatorSet::default()
        };

        if let Some((macd, signal, hist)) = eval(Indicator::Macd {
            fast: p.macd_fast,
            slow: p.macd_slow,
            signal: p.macd_signal,
        })
        .and_then(IndicatorValue::triple)
        {
            set.macd = Some(macd);
            set.macd_signal = Some(signal);
            set.macd_hist = Some(hist);
        }

        if let Some((upper, middle, lower)) = eval(Indicator::Bollinger {
            period: p.bbands_period,
            num_std: p.bbands_num_std,
        })
        .and_then(IndicatorValue::triple)
        {
            set.bbands_upper = Some(upper);
            set.bbands_middle = Some(middle);
            set.bbands_lower = Some(lower);
        }

        if let Some((k, d)) = eval(Indicator::StochRsi {
            period: p.stochrsi_period,
            fastk: p.stochrsi_fastk,
            fastd: p.stochrsi_fastd,
        })
        .and_then(IndicatorValue::pair)
        {
            set.stochrsi_fastk = Some(k);
            set.stochrsi_fastd = Some(d);
        }

        set.ichimoku_span_a = match (set.ichimoku_conv, set.ichimoku_base) {
            (Some(conv), Some(base)) => Some((conv + base) / 2.0),
            _ => None,
        };

        IndicatorSnapshot {
            candle: candle.clone(),
            indicators: set,
        }
    }
}
