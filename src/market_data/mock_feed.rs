// =============================================================================
// Mock Trade Feed: deterministic synthetic trades for local runs
// =============================================================================

use crate::market_data::trade::Trade;

/// Round-robins over `pairs`, producing a smooth oscillating price per pair.
pub struct MockTradeFeed {
    pairs: Vec<String>,
    next_timestamp_ms: i64,
    step_ms: i64,
    tick: u64,
}

impl MockTradeFeed {
    pub fn new(pairs: Vec<String>, start_timestamp_ms: i64, step_ms: i64) -> Self {
        Self {
            pairs,
            next_timestamp_ms: start_timestamp_ms,
            step_ms: step_ms.max(1),
            tick: 0,
        }
    }
}

impl Iterator for MockTradeFeed {
    type Item = Trade;

    fn next(&mut self) -> Option<Trade> {
        if self.pairs.is_empty() {
            return None;
        }

        let index = (self.tick % self.pairs.len() as u64) as usize;
        let round = self.tick / self.pairs.len() as u64;
        let base = 100.0 * (index + 1) as f64;
        let price = base * (1.0 + 0.01 * ((round as f64) * 0.37 + index as f64).sin());
        let volume = 0.1 + (round % 7) as f64 * 0.05;

        let trade = Trade::new(self.pairs[index].clone(), price, volume, self.next_timestamp_ms);

        self.tick += 1;
        if index + 1 == self.pairs.len() {
            self.next_timestamp_ms += self.step_ms;
        }
        Some(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robins_pairs_with_shared_timestamp() {
        let mut feed = MockTradeFeed::new(vec!["A/B".into(), "C/D".into()], 1_000, 500);
        let trades: Vec<Trade> = feed.by_ref().take(4).collect();

        assert_eq!(trades[0].pair, "A/B");
        assert_eq!(trades[1].pair, "C/D");
        assert_eq!(trades[0].timestamp_ms, 1_000);
        assert_eq!(trades[1].timestamp_ms, 1_000);
        assert_eq!(trades[2].timestamp_ms, 1_500);
        assert!(trades.iter().all(|t| t.price > 0.0 && t.volume > 0.0));
    }

    #[test]
    fn empty_pairs_end_immediately() {
        assert!(MockTradeFeed::new(Vec::new(), 0, 1).next().is_none());
    }
}
