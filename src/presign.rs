//! Pre-signed transaction cache
//!
//! Pools of ready-to-submit payloads keyed by (token, direction). A cache
//! hit lets a worker skip transaction construction entirely, which is the
//! fastest execution path regardless of urgency tier. Payloads are consumed
//! at most once; `refresh` drops stale ones and tops up shallow pools.

use crate::config::PresignConfig;
use crate::types::TradeDirection;
use bytes::Bytes;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

const TRADABLE_DIRECTIONS: [TradeDirection; 2] = [TradeDirection::Buy, TradeDirection::Sell];

/// A payload prepared ahead of signal arrival.
///
/// The simulated payload stands in for a signed transaction; in production
/// `payload` comes from the wallet signer.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub token_address: String,
    pub direction: TradeDirection,
    pub payload: Bytes,
    pub prepared_at: Instant,
}

/// Counts reported by one `refresh` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub dropped: usize,
    pub refilled: usize,
}

/// Concurrent per-(token, direction) pools of prepared payloads.
pub struct PreSignedCache {
    pools: DashMap<(String, TradeDirection), Vec<PreparedTransaction>>,
    target_quantity: usize,
    low_watermark: usize,
    ttl: Duration,
}

impl PreSignedCache {
    pub fn new(config: &PresignConfig) -> Self {
        Self {
            pools: DashMap::new(),
            target_quantity: config.target_quantity,
            low_watermark: config.low_watermark,
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }

    /// Materialize `quantity` payloads per tradable direction for `token`,
    /// appending to whatever the pools already hold.
    pub fn reserve(&self, token: &str, quantity: usize) {
        for direction in TRADABLE_DIRECTIONS {
            let mut pool = self
                .pools
                .entry((token.to_string(), direction))
                .or_default();
            let offset = pool.len();
            for i in 0..quantity {
                pool.push(prepare_payload(token, direction, offset + i));
            }
        }
        debug!(token, quantity, "pre-signed transactions reserved");
    }

    /// Whether a payload is ready for instant execution.
    #[inline]
    pub fn has_ready(&self, token: &str, direction: TradeDirection) -> bool {
        self.pools
            .get(&(token.to_string(), direction))
            .map(|pool| !pool.is_empty())
            .unwrap_or(false)
    }

    /// Consume one payload. Each payload is handed out exactly once; racing
    /// callers on the last payload see `None`.
    pub fn take(&self, token: &str, direction: TradeDirection) -> Option<PreparedTransaction> {
        self.pools
            .get_mut(&(token.to_string(), direction))
            .and_then(|mut pool| pool.pop())
    }

    pub fn ready_count(&self, token: &str, direction: TradeDirection) -> usize {
        self.pools
            .get(&(token.to_string(), direction))
            .map(|pool| pool.len())
            .unwrap_or(0)
    }

    /// Drop payloads older than the ttl, then refill tracked pools that sit
    /// at or below the low-watermark back to the target size. Refill only
    /// tops up; a pool already at or above the target is left as it is.
    pub fn refresh(&self) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();
        for mut entry in self.pools.iter_mut() {
            let (token, direction) = entry.key().clone();
            let pool = entry.value_mut();

            let before = pool.len();
            pool.retain(|tx| tx.prepared_at.elapsed() <= self.ttl);
            outcome.dropped += before - pool.len();

            if pool.len() <= self.low_watermark {
                let offset = pool.len();
                let missing = self.target_quantity.saturating_sub(pool.len());
                for i in 0..missing {
                    pool.push(prepare_payload(&token, direction, offset + i));
                }
                outcome.refilled += missing;
            }
        }
        if outcome.dropped > 0 || outcome.refilled > 0 {
            debug!(
                dropped = outcome.dropped,
                refilled = outcome.refilled,
                "pre-signed pools refreshed"
            );
        }
        outcome
    }

    pub fn clear(&self) {
        self.pools.clear();
    }
}

fn prepare_payload(token: &str, direction: TradeDirection, index: usize) -> PreparedTransaction {
    PreparedTransaction {
        token_address: token.to_string(),
        direction,
        payload: Bytes::from(format!("signed_tx_{}_{}_{}", token, direction.as_str(), index)),
        prepared_at: Instant::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn cache(target: usize, watermark: usize, ttl_secs: u64) -> PreSignedCache {
        PreSignedCache::new(&PresignConfig {
            target_quantity: target,
            ttl_secs,
            low_watermark: watermark,
        })
    }

    #[test]
    fn test_reserve_fills_both_directions() {
        let cache = cache(10, 2, 30);
        cache.reserve("mint", 3);
        assert_eq!(cache.ready_count("mint", TradeDirection::Buy), 3);
        assert_eq!(cache.ready_count("mint", TradeDirection::Sell), 3);
        assert!(cache.has_ready("mint", TradeDirection::Buy));
        assert!(!cache.has_ready("other", TradeDirection::Buy));
    }

    #[test]
    fn test_take_consumes_at_most_once() {
        let cache = cache(10, 2, 30);
        cache.reserve("mint", 2);
        assert!(cache.take("mint", TradeDirection::Buy).is_some());
        assert!(cache.take("mint", TradeDirection::Buy).is_some());
        assert!(cache.take("mint", TradeDirection::Buy).is_none());
        // Sell pool untouched by buy takes.
        assert_eq!(cache.ready_count("mint", TradeDirection::Sell), 2);
    }

    #[test]
    fn test_concurrent_takes_never_share_a_payload() {
        let cache = Arc::new(cache(10, 0, 30));
        cache.reserve("mint", 4);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.take("mint", TradeDirection::Buy))
            })
            .collect();

        let taken: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(taken.len(), 4);
        let unique: HashSet<_> = taken.iter().map(|tx| tx.payload.clone()).collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_refresh_drops_stale_payloads_and_refills() {
        let cache = cache(5, 2, 0);
        cache.reserve("mint", 5);
        std::thread::sleep(Duration::from_millis(5));

        let outcome = cache.refresh();
        assert_eq!(outcome.dropped, 10);
        assert_eq!(outcome.refilled, 10);
        assert_eq!(cache.ready_count("mint", TradeDirection::Buy), 5);
    }

    #[test]
    fn test_refresh_tops_up_shallow_pools_only() {
        let cache = cache(5, 2, 3600);
        cache.reserve("mint", 5);
        for _ in 0..4 {
            cache.take("mint", TradeDirection::Buy);
        }
        assert_eq!(cache.ready_count("mint", TradeDirection::Buy), 1);

        let outcome = cache.refresh();
        assert_eq!(cache.ready_count("mint", TradeDirection::Buy), 5);
        // Sell pool was full and above the watermark.
        assert_eq!(cache.ready_count("mint", TradeDirection::Sell), 5);
        assert_eq!(outcome.refilled, 4);
    }

    #[test]
    fn test_refresh_leaves_overfull_pools_alone() {
        // Hand-built configs bypass validation, so the watermark can sit
        // above the target while reserve has overfilled the pools.
        let cache = cache(2, 8, 3600);
        cache.reserve("mint", 4);
        cache.take("mint", TradeDirection::Buy);

        let outcome = cache.refresh();
        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.refilled, 0);
        assert_eq!(cache.ready_count("mint", TradeDirection::Buy), 3);
        assert_eq!(cache.ready_count("mint", TradeDirection::Sell), 4);
    }

    #[test]
    fn test_clear_empties_every_pool() {
        let cache = cache(5, 2, 30);
        cache.reserve("a", 2);
        cache.reserve("b", 2);
        cache.clear();
        assert!(!cache.has_ready("a", TradeDirection::Buy));
        assert!(!cache.has_ready("b", TradeDirection::Sell));
    }
}
