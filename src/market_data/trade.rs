// =============================================================================
// Trade Decoding: raw JSON messages into typed `Trade` records
// =============================================================================
//
// Accepted message shapes (one JSON document per line):
//
//   { "pair": "BTC/USD", "price": 0.5147, "volume": 1136.19, "timestamp_ms": 1695628176925 }
//   { "pair": "BTC/USD", "price": 0.5147, "volume": 1136.19, "timestamp": "2023-09-25T07:49:36.925603Z" }
//   { "channel": "trade", "data": [ { "symbol": "BTC/USD", "price": 0.5147,
//                                     "qty": 1136.19, "timestamp": "2023-09-25T07:49:36.925603Z" } ] }
//
// Malformed records never stop the stream: the caller logs and drops them.
// =============================================================================

use anyhow::{Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A single executed trade for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub pair: String,
    pub price: f64,
    pub volume: f64,
    pub timestamp_ms: i64,
}

impl Trade {
    pub fn new(pair: impl Into<String>, price: f64, volume: f64, timestamp_ms: i64) -> Self {
        Self {
            pair: pair.into(),
            price,
            volume,
            timestamp_ms,
        }
    }

    /// Reject values the reducer cannot fold meaningfully.
    fn validate(self) -> Result<Self> {
        if self.pair.trim().is_empty() {
            anyhow::bail!("trade has an empty pair");
        }
        if !self.price.is_finite() {
            anyhow::bail!("trade price {} is not finite", self.price);
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            anyhow::bail!("trade volume {} is not a finite non-negative number", self.volume);
        }
        Ok(self)
    }
}

/// Decode one raw message into zero or more trades.
///
/// Returns an error when the message as a whole is unusable. Inside an
/// exchange envelope, individual bad entries are logged and skipped so one
/// broken trade does not take its siblings down with it.
pub fn decode_message(text: &str) -> Result<Vec<Trade>> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse trade JSON")?;

    if let Some(channel) = root.get("channel").and_then(|c| c.as_str()) {
        if channel != "trade" {
            debug!(channel = %channel, "ignoring non-trade channel message");
            return Ok(Vec::new());
        }
        let entries = root["data"]
            .as_array()
            .context("trade envelope has no data array")?;

        let mut trades = Vec::with_capacity(entries.len());
        for entry in entries {
            match decode_exchange_entry(entry) {
                Ok(trade) => trades.push(trade),
                Err(e) => warn!(error = %format!("{e:#}"), "dropping malformed trade in envelope"),
            }
        }
        return Ok(trades);
    }

    decode_flat(&root).map(|trade| vec![trade])
}

/// Decode a flat `Trade`-shaped record.
fn decode_flat(value: &serde_json::Value) -> Result<Trade> {
    let pair = value["pair"]
        .as_str()
        .context("missing field pair")?
        .to_string();
    let price = parse_f64(&value["price"], "price")?;
    let volume = parse_f64(&value["volume"], "volume")?;

    let timestamp_ms = match value.get("timestamp_ms") {
        Some(ts) if !ts.is_null() => ts.as_i64().context("field timestamp_ms is not an integer")?,
        _ => parse_timestamp(&value["timestamp"])?,
    };

    Trade::new(pair, price, volume, timestamp_ms).validate()
}

/// Decode one entry of a Kraken v2 `trade` channel message.
fn decode_exchange_entry(value: &serde_json::Value) -> Result<Trade> {
    let pair = value["symbol"]
        .as_str()
        .context("missing field symbol")?
        .to_string();
    let price = parse_f64(&value["price"], "price")?;
    let volume = parse_f64(&value["qty"], "qty")?;
    let timestamp_ms = parse_timestamp(&value["timestamp"])?;

    Trade::new(pair, price, volume, timestamp_ms).validate()
}

/// Exchanges send numbers either as JSON numbers or as numeric strings.
fn parse_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}")),
        serde_json::Value::Null => anyhow::bail!("missing field {name}"),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

/// RFC 3339 timestamp string to epoch milliseconds.
fn parse_timestamp(val: &serde_json::Value) -> Result<i64> {
    let raw = val.as_str().context("missing field timestamp")?;
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("failed to parse timestamp {raw}"))?;
    Ok(parsed.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_trade_with_millis() {
        let trades =
            decode_message(r#"{"pair":"X/Y","price":10.0,"volume":1.5,"timestamp_ms":3000}"#)
                .unwrap();
        assert_eq!(trades, vec![Trade::new("X/Y", 10.0, 1.5, 3000)]);
    }

    #[test]
    fn flat_trade_with_iso_timestamp() {
        let trades = decode_message(
            r#"{"pair":"MATIC/USD","price":0.5147,"volume":1136.19677815,
                "timestamp":"2023-09-25T07:49:36.925603Z"}"#,
        )
        .unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].timestamp_ms, 1_695_628_176_925);
    }

    #[test]
    fn exchange_envelope() {
        let json = r#"{
            "channel": "trade",
            "type": "update",
            "data": [
                {"symbol":"BTC/USD","side":"buy","price":26000.5,"qty":"0.25",
                 "ord_type":"limit","trade_id":1,"timestamp":"2023-09-25T07:49:36.000Z"},
                {"symbol":"BTC/USD","side":"sell","price":26001.0,"qty":0.5,
                 "ord_type":"market","trade_id":2,"timestamp":"2023-09-25T07:49:37.000Z"}
            ]
        }"#;
        let trades = decode_message(json).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].pair, "BTC/USD");
        assert!((trades[0].volume - 0.25).abs() < f64::EPSILON);
        assert_eq!(trades[1].timestamp_ms - trades[0].timestamp_ms, 1_000);
    }

    #[test]
    fn envelope_skips_bad_entries_only() {
        let json = r#"{"channel":"trade","data":[
            {"symbol":"BTC/USD","price":1.0,"timestamp":"2023-09-25T07:49:36Z"},
            {"symbol":"BTC/USD","price":2.0,"qty":1.0,"timestamp":"2023-09-25T07:49:36Z"}
        ]}"#;
        let trades = decode_message(json).unwrap();
        assert_eq!(trades.len(), 1);
        assert!((trades[0].price - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn heartbeat_yields_nothing() {
        assert!(decode_message(r#"{"channel":"heartbeat"}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_fields_are_errors() {
        assert!(decode_message(r#"{"pair":"X/Y","price":1.0,"timestamp_ms":0}"#).is_err());
        assert!(decode_message(r#"{"price":1.0,"volume":1.0,"timestamp_ms":0}"#).is_err());
        assert!(decode_message(r#"{"pair":"X/Y","price":1.0,"volume":1.0}"#).is_err());
        assert!(decode_message("not json").is_err());
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(decode_message(r#"{"pair":"X/Y","price":1.0,"volume":-1.0,"timestamp_ms":0}"#).is_err());
        assert!(decode_message(r#"{"pair":"","price":1.0,"volume":1.0,"timestamp_ms":0}"#).is_err());
        assert!(decode_message(r#"{"pair":"X/Y","price":"abc","volume":1.0,"timestamp_ms":0}"#).is_err());
    }
}
