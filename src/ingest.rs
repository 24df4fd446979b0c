// =============================================================================
// Trade ingestion
// =============================================================================
//
// Reads newline-delimited JSON (file or stdin) or the synthetic mock feed and
// routes each decoded trade to the channel of the shard that owns its pair.
// Sending awaits channel capacity, so a paused shard slows ingestion down.
// =============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::market_data::mock_feed::MockTradeFeed;
use crate::market_data::trade::decode_message;
use crate::market_data::Trade;
use crate::pipeline::ShardedState;

/// Where trades come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
    Mock,
}

impl InputSource {
    /// `[--mock] [INPUT_PATH]`; no path means stdin.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut mock = false;
        let mut path = None;
        for arg in args {
            match arg.as_str() {
                "--mock" => mock = true,
                flag if flag.starts_with("--") => bail!("unknown flag: {flag}"),
                _ if path.is_some() => bail!("more than one input path given"),
                _ => path = Some(PathBuf::from(arg)),
            }
        }
        match (mock, path) {
            (true, Some(_)) => bail!("--mock does not take an input path"),
            (true, None) => Ok(Self::Mock),
            (false, Some(p)) => Ok(Self::File(p)),
            (false, None) => Ok(Self::Stdin),
        }
    }
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub trades: u64,
    pub dropped: u64,
}

/// Sends trades to their owning shard worker.
pub struct Router {
    state: Arc<ShardedState>,
    senders: Vec<mpsc::Sender<Trade>>,
}

impl Router {
    pub fn new(state: Arc<ShardedState>, senders: Vec<mpsc::Sender<Trade>>) -> Self {
        Self { state, senders }
    }

    /// Returns `false` once the owning worker has stopped.
    pub async fn route(&self, trade: Trade) -> bool {
        let shard = self.state.shard_for(&trade.pair);
        let Some(tx) = self.senders.get(shard) else {
            warn!(shard, "no worker for shard");
            return false;
        };
        if tx.send(trade).await.is_err() {
            warn!(shard, "shard worker stopped, ending ingestion");
            return false;
        }
        true
    }
}

/// Decode every line of `reader` and route the trades. Malformed lines are
/// dropped with a warning.
pub async fn pump_lines<R>(reader: R, router: &Router) -> Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = IngestStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("failed to read input line")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        let trades = match decode_message(line) {
            Ok(trades) => trades,
            Err(e) => {
                stats.dropped += 1;
                warn!(line = stats.lines, error = %e, "dropping malformed input");
                continue;
            }
        };

        for trade in trades {
            if !router.route(trade).await {
                return Ok(stats);
            }
            stats.trades += 1;
        }
    }

    Ok(stats)
}

/// Feed synthetic trades until a worker stops or `limit` trades were sent.
pub async fn pump_mock(
    pairs: Vec<String>,
    step_ms: i64,
    pace: Duration,
    limit: Option<u64>,
    router: &Router,
) -> IngestStats {
    let start = chrono::Utc::now().timestamp_millis();
    let mut stats = IngestStats::default();
    let mut ticker = tokio::time::interval(pace);

    for trade in MockTradeFeed::new(pairs, start, step_ms) {
        if limit.is_some_and(|l| stats.trades >= l) {
            break;
        }
        ticker.tick().await;
        if !router.route(trade).await {
            break;
        }
        stats.trades += 1;
    }
    stats
}

/// Run the configured source to completion.
pub async fn run(source: InputSource, pairs: Vec<String>, router: &Router) -> Result<IngestStats> {
    let stats = match source {
        InputSource::Stdin => {
            info!("reading trades from stdin");
            pump_lines(BufReader::new(tokio::io::stdin()), router).await?
        }
        InputSource::File(path) => {
            info!(path = %path.display(), "reading trades from file");
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open input {}", path.display()))?;
            pump_lines(BufReader::new(file), router).await?
        }
        InputSource::Mock => {
            info!(pairs = ?pairs, "starting mock trade feed");
            pump_mock(pairs, 1_000, Duration::from_millis(100), None, router).await
        }
    };

    info!(
        lines = stats.lines,
        trades = stats.trades,
        dropped = stats.dropped,
        "input exhausted"
    );
    Ok(stats)
}
