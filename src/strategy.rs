//! Urgency-tiered execution strategies
//!
//! Each urgency tier maps to exactly one strategy; selection is a closed
//! lookup, never a branch chain at the call site. Strategies trade
//! execution quality for latency: the faster the tier, the higher the
//! modeled slippage and fee and the lower the modeled reliability. The
//! market response itself is simulated; in production each path submits
//! through a venue client.

use crate::market::MarketContext;
use crate::presign::PreparedTransaction;
use crate::types::{ExecutionResult, ExecutionUrgency, Signal, TradeDirection};
use tracing::trace;

/// The closed set of execution paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Sub-millisecond path, no routing at all.
    Microsecond,
    /// ~1ms path with minimal optimization.
    UltraFast,
    /// ~10ms path using the cached route table.
    HighFrequency,
    /// ~100ms path with full price optimization.
    Optimized,
}

impl ExecutionStrategy {
    /// Strategy lookup for an urgency tier.
    #[inline]
    pub fn for_urgency(urgency: ExecutionUrgency) -> Self {
        match urgency {
            ExecutionUrgency::Microsecond => ExecutionStrategy::Microsecond,
            ExecutionUrgency::UltraFast => ExecutionStrategy::UltraFast,
            ExecutionUrgency::HighFrequency => ExecutionStrategy::HighFrequency,
            ExecutionUrgency::LowLatency => ExecutionStrategy::Optimized,
        }
    }

    /// Run the strategy against the current market context.
    pub fn execute(self, signal: &Signal, market: &MarketContext) -> ExecutionResult {
        trace!(strategy = ?self, signal_id = %signal.id, "dispatching");
        match self {
            ExecutionStrategy::Microsecond => execute_microsecond(signal, market),
            ExecutionStrategy::UltraFast => execute_ultra_fast(signal, market),
            ExecutionStrategy::HighFrequency => execute_high_frequency(signal, market),
            ExecutionStrategy::Optimized => execute_optimized(signal, market),
        }
    }
}

/// Instant submission of a prepared payload; skips every strategy path.
pub fn execute_presigned(
    signal: &Signal,
    _prepared: &PreparedTransaction,
    market: &MarketContext,
) -> ExecutionResult {
    let price = market.prices.current_price(&signal.token_address);
    success_result(signal, "pre_signed_", "Raydium_PreSigned", price, 2.0, 0.001)
}

/// Modeled probability that an attempt fills, before the random roll.
///
/// Base rate per strategy, raised by signal strength, lowered by network
/// congestion and by how aggressive the latency tier is, clamped to
/// [0.1, 1.0].
pub fn modeled_success_rate(signal: &Signal, base_rate: f64, congestion: f64) -> f64 {
    let mut rate = base_rate;
    rate += signal.strength.weight() * 0.05;
    rate -= congestion * 0.2;
    rate -= match signal.urgency {
        ExecutionUrgency::Microsecond => 0.15,
        ExecutionUrgency::UltraFast => 0.10,
        ExecutionUrgency::HighFrequency => 0.05,
        ExecutionUrgency::LowLatency => 0.0,
    };
    rate.clamp(0.1, 1.0)
}

fn roll_success(signal: &Signal, base_rate: f64, market: &MarketContext) -> bool {
    fastrand::f64() < modeled_success_rate(signal, base_rate, market.congestion.level())
}

fn execute_microsecond(signal: &Signal, market: &MarketContext) -> ExecutionResult {
    // No routing and no fill simulation on this path.
    let price = market.prices.current_price(&signal.token_address);
    success_result(signal, "microsec_", "Raydium_UltraFast", price, 5.0, 0.005)
}

fn execute_ultra_fast(signal: &Signal, market: &MarketContext) -> ExecutionResult {
    if !roll_success(signal, 0.8, market) {
        return ExecutionResult::failed(signal.id, "Network congestion - execution failed");
    }

    let spot = market.prices.current_price(&signal.token_address);
    let adjustment = if signal.direction == TradeDirection::Buy {
        0.002
    } else {
        -0.002
    };
    let price = spot * (1.0 + adjustment);
    success_result(signal, "ultra_", "Jupiter_Fast", price, 8.0, 0.003)
}

fn execute_high_frequency(signal: &Signal, market: &MarketContext) -> ExecutionResult {
    let routes = market.routes.optimal_routes(&signal.token_address);

    if !roll_success(signal, 0.85, market) {
        return ExecutionResult::failed(signal.id, "Optimal routing failed");
    }

    let price = optimal_execution_price(signal, market);
    let venue = routes
        .first()
        .cloned()
        .unwrap_or_else(|| "Orca".to_string());
    success_result(signal, "hf_", venue, price, 12.0, 0.002)
}

fn execute_optimized(signal: &Signal, market: &MarketContext) -> ExecutionResult {
    if !roll_success(signal, 0.95, market) {
        return ExecutionResult::failed(signal.id, "Market impact too high");
    }

    let price = optimal_execution_price(signal, market) * 0.999;
    success_result(signal, "normal_", "Jupiter_Optimized", price, 15.0, 0.001)
}

/// Spot price shifted by the signal's expected impact, towards the taker.
fn optimal_execution_price(signal: &Signal, market: &MarketContext) -> f64 {
    let base = market.prices.current_price(&signal.token_address);
    if signal.direction == TradeDirection::Buy {
        base * (1.0 + signal.expected_price_impact)
    } else {
        base * (1.0 - signal.expected_price_impact)
    }
}

fn success_result(
    signal: &Signal,
    tx_prefix: &str,
    venue: impl Into<String>,
    price: f64,
    slippage_bps: f64,
    fee: f64,
) -> ExecutionResult {
    ExecutionResult {
        signal_id: signal.id,
        success: true,
        tx_reference: Some(tx_reference(tx_prefix)),
        venue: Some(venue.into()),
        executed_price: price,
        executed_quantity: signal.position_size / price,
        slippage_bps,
        execution_latency_us: 0,
        pipeline_latency_us: 0,
        fee,
        error: None,
    }
}

fn tx_reference(prefix: &str) -> String {
    format!("{}{:016x}", prefix, fastrand::u64(..))
}
