// =============================================================================
// candle-stream: Main Entry Point
// =============================================================================
//
// Trades in, OHLCV candles folded per pair, bounded candle history per pair,
// technical indicators recomputed on every emitted candle, snapshots out.
//
//   candle-stream [--mock] [INPUT_PATH]
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analytics;
mod indicators;
mod ingest;
mod market_data;
mod pipeline;
mod runtime_config;
mod sink;
mod types;

use std::sync::Arc;

use anyhow::Context;
use futures_util::future::join_all;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::analytics::NativeAnalytics;
use crate::ingest::{InputSource, Router};
use crate::market_data::{CandleReducer, EmissionPolicy};
use crate::pipeline::{IndicatorPipeline, ShardWorker, ShardedState};
use crate::runtime_config::RuntimeConfig;
use crate::sink::{AnySink, BatchingSink, JsonLinesSink, StdoutSink};
use crate::types::SinkKind;

const DEFAULT_CONFIG_PATH: &str = "candle_stream.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("candle-stream starting up");

    let source = InputSource::from_args(std::env::args().skip(1))?;

    let config_path =
        std::env::var("CANDLE_STREAM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    if !std::path::Path::new(&config_path).exists() {
        // Leave an editable copy of the defaults behind.
        if let Err(e) = config.save(&config_path) {
            warn!(error = %e, "Failed to write default config");
        }
    }
    config
        .apply_overrides(|key| std::env::var(key).ok())
        .context("invalid environment override")?;
    config.validate()?;

    info!(
        pairs = ?config.pairs,
        candle_seconds = config.candle_seconds,
        max_candles_in_state = config.max_candles_in_state,
        emission_mode = %config.emission_mode,
        shards = config.shard_count,
        sink = %config.sink.kind,
        topic = %config.sink.topic,
        "configuration resolved"
    );

    // ── 2. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(ShardedState::new(
        config.shard_count,
        CandleReducer::new(config.window_ms()),
        EmissionPolicy::new(config.emission_mode),
        config.max_candles_in_state,
    ));
    let pipeline = Arc::new(IndicatorPipeline::new(
        Arc::new(NativeAnalytics),
        config.indicators.clone(),
    ));

    // ── 3. Spawn one worker per shard ────────────────────────────────────
    let mut senders = Vec::with_capacity(state.shard_count());
    let mut handles = Vec::with_capacity(state.shard_count());

    for shard in 0..state.shard_count() {
        let output = match config.sink.kind {
            SinkKind::Jsonl => AnySink::Jsonl(
                JsonLinesSink::open(&config.sink.path, config.sink.retry_after()).await?,
            ),
            SinkKind::Stdout => AnySink::Stdout(StdoutSink::new(config.sink.retry_after())),
        };
        let sink = BatchingSink::new(
            output,
            config.sink.topic.clone(),
            shard,
            config.sink.batch_size,
            config.sink.max_retries,
        );

        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let worker = ShardWorker::new(shard, state.clone(), pipeline.clone(), sink);
        handles.push(tokio::spawn(worker.run(rx)));
        senders.push(tx);
    }

    // ── 4. Ingest until input ends or Ctrl-C ─────────────────────────────
    let router = Router::new(state.clone(), senders);
    let mut ingest_error = None;
    tokio::select! {
        result = ingest::run(source, config.pairs.clone(), &router) => {
            if let Err(e) = result {
                error!(error = %format!("{e:#}"), "ingestion failed");
                ingest_error = Some(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested, draining shard queues");
        }
    }
    // Closing the channels lets the workers drain and exit.
    drop(router);

    // ── 5. Join workers ──────────────────────────────────────────────────
    let mut failed = 0;
    for (shard, joined) in join_all(handles).await.into_iter().enumerate() {
        match joined {
            Ok(Ok(stats)) => info!(
                shard,
                trades = stats.trades,
                snapshots = stats.snapshots,
                "shard finished"
            ),
            Ok(Err(e)) => {
                error!(shard, error = %e, "shard worker failed");
                failed += 1;
            }
            Err(e) => {
                error!(shard, error = %e, "shard worker panicked");
                failed += 1;
            }
        }
    }

    info!(pairs_per_shard = ?state.pairs_per_shard(), "candle-stream stopped");

    if failed > 0 {
        anyhow::bail!("{failed} shard worker(s) failed");
    }
    match ingest_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
