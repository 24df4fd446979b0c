// =============================================================================
// Runtime Configuration
// =============================================================================
//
// Every tunable of the candle/indicator pipeline lives here. The file is
// JSON; all fields carry `#[serde(default)]` so a partial (or empty) file
// still loads. Environment variables override file values after loading.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{EmissionMode, SinkKind};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_pairs() -> Vec<String> {
    vec!["BTC/USD".to_string(), "ETH/USD".to_string()]
}

fn default_candle_seconds() -> u64 {
    60
}

fn default_max_candles_in_state() -> usize {
    60
}

fn default_shard_count() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_topic() -> String {
    "technical_indicators".to_string()
}

fn default_sink_path() -> String {
    "technical_indicators.jsonl".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_after_secs() -> u64 {
    30
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Parameters of the indicators whose output field names do not encode their
/// period. RSI (9/14/21) and SMA (7/14/21) periods are fixed by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bbands_period: usize,
    pub bbands_num_std: f64,
    pub stochrsi_period: usize,
    pub stochrsi_fastk: usize,
    pub stochrsi_fastd: usize,
    pub adx_period: usize,
    pub volume_ema_period: usize,
    pub ichimoku_conversion: usize,
    pub ichimoku_base: usize,
    pub ichimoku_span_b: usize,
    pub mfi_period: usize,
    pub atr_period: usize,
    pub roc_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        // Slightly faster than the textbook settings; crypto trades 24/7.
        Self {
            macd_fast: 10,
            macd_slow: 24,
            macd_signal: 9,
            bbands_period: 20,
            bbands_num_std: 2.0,
            stochrsi_period: 10,
            stochrsi_fastk: 5,
            stochrsi_fastd: 3,
            adx_period: 14,
            volume_ema_period: 10,
            ichimoku_conversion: 9,
            ichimoku_base: 20,
            ichimoku_span_b: 40,
            mfi_period: 10,
            atr_period: 10,
            roc_period: 6,
        }
    }
}

// =============================================================================
// SinkConfig
// =============================================================================

/// Downstream sink settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,

    /// Output file for the `jsonl` sink.
    #[serde(default = "default_sink_path")]
    pub path: String,

    /// Logical topic name attached to every batch.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Snapshots buffered per shard before a flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Retryable failures tolerated per batch before it is declared fatal.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay reported by the `jsonl` sink when the disk is overloaded.
    #[serde(default = "default_retry_after_secs")]
    pub retry_after_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            path: default_sink_path(),
            topic: default_topic(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_after_secs: default_retry_after_secs(),
        }
    }
}

impl SinkConfig {
    pub fn retry_after(&self) -> Duration {
        Duration::from_secs(self.retry_after_secs)
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Pairs the mock feed trades. Real input is not filtered by this list.
    #[serde(default = "default_pairs")]
    pub pairs: Vec<String>,

    /// Candle width in seconds.
    #[serde(default = "default_candle_seconds")]
    pub candle_seconds: u64,

    /// History capacity per pair.
    #[serde(default = "default_max_candles_in_state")]
    pub max_candles_in_state: usize,

    #[serde(default)]
    pub emission_mode: EmissionMode,

    /// Number of shard workers; pairs are hashed onto shards.
    #[serde(default = "default_shard_count")]
    pub shard_count: usize,

    /// Bounded queue length in front of each shard worker.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub indicators: IndicatorParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pairs: default_pairs(),
            candle_seconds: default_candle_seconds(),
            max_candles_in_state: default_max_candles_in_state(),
            emission_mode: EmissionMode::default(),
            shard_count: default_shard_count(),
            channel_capacity: default_channel_capacity(),
            sink: SinkConfig::default(),
            indicators: IndicatorParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            pairs = ?config.pairs,
            emission_mode = %config.emission_mode,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in
    /// production; tests pass a map.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(pairs) = lookup("CANDLE_PAIRS") {
            self.pairs = pairs
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("CANDLE_SECONDS") {
            self.candle_seconds = v
                .trim()
                .parse()
                .with_context(|| format!("CANDLE_SECONDS is not an integer: {v}"))?;
        }
        if let Some(v) = lookup("MAX_CANDLES_IN_STATE") {
            self.max_candles_in_state = v
                .trim()
                .parse()
                .with_context(|| format!("MAX_CANDLES_IN_STATE is not an integer: {v}"))?;
        }
        if let Some(v) = lookup("EMIT_INCOMPLETE_CANDLES") {
            let incomplete: bool = v
                .trim()
                .to_lowercase()
                .parse()
                .with_context(|| format!("EMIT_INCOMPLETE_CANDLES is not true/false: {v}"))?;
            self.emission_mode = if incomplete {
                EmissionMode::Incomplete
            } else {
                EmissionMode::Final
            };
        }
        if let Some(v) = lookup("CANDLE_SHARDS") {
            self.shard_count = v
                .trim()
                .parse()
                .with_context(|| format!("CANDLE_SHARDS is not an integer: {v}"))?;
        }
        if let Some(v) = lookup("OUTPUT_TOPIC") {
            self.sink.topic = v.trim().to_string();
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.candle_seconds == 0 {
            anyhow::bail!("candle_seconds must be positive");
        }
        if self.window_ms() <= 0 {
            anyhow::bail!("candle_seconds {} overflows the window width", self.candle_seconds);
        }
        if self.max_candles_in_state == 0 {
            anyhow::bail!("max_candles_in_state must be at least 1");
        }
        if self.shard_count == 0 {
            anyhow::bail!("shard_count must be at least 1");
        }
        if self.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be at least 1");
        }
        if self.sink.batch_size == 0 {
            anyhow::bail!("sink.batch_size must be at least 1");
        }
        Ok(())
    }

    /// Window width in milliseconds; non-positive when `candle_seconds` does
    /// not fit.
    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.candle_seconds)
            .ok()
            .and_then(|s| s.checked_mul(1_000))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.pairs, vec!["BTC/USD", "ETH/USD"]);
        assert_eq!(cfg.candle_seconds, 60);
        assert_eq!(cfg.window_ms(), 60_000);
        assert_eq!(cfg.emission_mode, EmissionMode::Incomplete);
        assert_eq!(cfg.sink.kind, SinkKind::Jsonl);
        assert_eq!(cfg.indicators.macd_slow, 24);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{
            "emission_mode": "final",
            "max_candles_in_state": 3,
            "sink": { "kind": "stdout" },
            "indicators": { "adx_period": 7 }
        }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.emission_mode, EmissionMode::Final);
        assert_eq!(cfg.max_candles_in_state, 3);
        assert_eq!(cfg.sink.kind, SinkKind::Stdout);
        assert_eq!(cfg.sink.batch_size, 100);
        assert_eq!(cfg.indicators.adx_period, 7);
        assert_eq!(cfg.indicators.atr_period, 10);
    }

    #[test]
    fn env_overrides() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_overrides(env(&[
            ("CANDLE_PAIRS", "btc/usd, sol/usd,"),
            ("CANDLE_SECONDS", "10"),
            ("MAX_CANDLES_IN_STATE", "2"),
            ("EMIT_INCOMPLETE_CANDLES", "False"),
            ("OUTPUT_TOPIC", "features"),
        ]))
        .unwrap();
        assert_eq!(cfg.pairs, vec!["BTC/USD", "SOL/USD"]);
        assert_eq!(cfg.window_ms(), 10_000);
        assert_eq!(cfg.max_candles_in_state, 2);
        assert_eq!(cfg.emission_mode, EmissionMode::Final);
        assert_eq!(cfg.sink.topic, "features");
    }

    #[test]
    fn bad_env_override_is_an_error() {
        let mut cfg = RuntimeConfig::default();
        assert!(cfg.apply_overrides(env(&[("CANDLE_SECONDS", "soon")])).is_err());
    }

    #[test]
    fn validation_rejects_zeroes() {
        let mut cfg = RuntimeConfig::default();
        cfg.candle_seconds = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.max_candles_in_state = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.shard_count = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.candle_seconds = u64::MAX;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candle_stream.json");

        let mut cfg = RuntimeConfig::default();
        cfg.emission_mode = EmissionMode::Final;
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(RuntimeConfig::load("/definitely/not/here.json").is_err());
    }
}
