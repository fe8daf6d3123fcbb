//! Market data collaborators and network condition tracking
//!
//! The pipeline consumes prices, routes, and token safety through the
//! traits below. The simulated implementations ship with the crate and
//! generate cached synthetic data; in production they are replaced with
//! real oracle and aggregator clients.

use crate::types::{ExecutionUrgency, Signal};
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use smallvec::{smallvec, SmallVec};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Route list small enough to stay on the stack for common tokens.
pub type RouteList = SmallVec<[String; 4]>;

pub trait PriceOracle: Send + Sync {
    fn current_price(&self, token: &str) -> f64;
}

pub trait RouteProvider: Send + Sync {
    fn optimal_routes(&self, token: &str) -> RouteList;
}

pub trait SafetyOracle: Send + Sync {
    /// `None` means the oracle has no opinion on the token.
    fn is_safe(&self, token: &str) -> Option<bool>;
}

/// Synthetic price source. The first query per token fixes its price.
#[derive(Default)]
pub struct SimulatedPriceOracle {
    prices: DashMap<String, f64>,
}

impl PriceOracle for SimulatedPriceOracle {
    fn current_price(&self, token: &str) -> f64 {
        *self
            .prices
            .entry(token.to_string())
            .or_insert_with(|| 0.001 + fastrand::f64() * (10.0 - 0.001))
    }
}

/// Static venue set served from a per-token cache.
#[derive(Default)]
pub struct SimulatedRouteProvider {
    routes: DashMap<String, RouteList>,
}

impl RouteProvider for SimulatedRouteProvider {
    fn optimal_routes(&self, token: &str) -> RouteList {
        self.routes
            .entry(token.to_string())
            .or_insert_with(|| {
                smallvec![
                    "Raydium".to_string(),
                    "Orca".to_string(),
                    "Serum".to_string(),
                ]
            })
            .clone()
    }
}

/// Flags roughly one token in ten as unsafe.
#[derive(Default)]
pub struct SimulatedSafetyOracle;

impl SafetyOracle for SimulatedSafetyOracle {
    fn is_safe(&self, _token: &str) -> Option<bool> {
        Some(fastrand::f64() > 0.1)
    }
}

/// Last observed network conditions and the fee recommendation derived
/// from them. Written by the congestion feeder, read on every dispatch.
pub struct CongestionTracker {
    level: AtomicCell<f64>,
    pending_txs: AtomicU64,
    recommended_fee: AtomicCell<f64>,
    base_fee: f64,
}

impl CongestionTracker {
    pub fn new(base_fee: f64) -> Self {
        Self {
            level: AtomicCell::new(0.0),
            pending_txs: AtomicU64::new(0),
            recommended_fee: AtomicCell::new(base_fee),
            base_fee,
        }
    }

    /// Record a congestion observation and refresh the fee recommendation.
    pub fn observe(&self, level: f64, pending_txs: u64) {
        self.level.store(level);
        self.pending_txs.store(pending_txs, Ordering::Relaxed);
        self.recommended_fee.store(self.base_fee * (1.0 + level * 10.0));
    }

    #[inline]
    pub fn level(&self) -> f64 {
        self.level.load()
    }

    pub fn pending_transactions(&self) -> u64 {
        self.pending_txs.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn recommended_fee(&self) -> f64 {
        self.recommended_fee.load()
    }

    /// Fee a producer should attach to a signal: the current recommendation
    /// scaled by the signal's own multiplier and its urgency tier.
    pub fn optimal_priority_fee(&self, signal: &Signal) -> f64 {
        let urgency_multiplier = match signal.urgency {
            ExecutionUrgency::Microsecond => 5.0,
            ExecutionUrgency::UltraFast => 3.0,
            ExecutionUrgency::HighFrequency => 2.0,
            ExecutionUrgency::LowLatency => 1.0,
        };
        self.recommended_fee() * signal.priority_fee_multiplier * urgency_multiplier
    }
}

/// Collaborator bundle handed to the dispatch path.
pub struct MarketContext {
    pub prices: Arc<dyn PriceOracle>,
    pub routes: Arc<dyn RouteProvider>,
    pub safety: Arc<dyn SafetyOracle>,
    pub congestion: CongestionTracker,
}

impl MarketContext {
    /// Fully simulated collaborators, the default wiring.
    pub fn simulated(base_fee: f64) -> Self {
        Self {
            prices: Arc::new(SimulatedPriceOracle::default()),
            routes: Arc::new(SimulatedRouteProvider::default()),
            safety: Arc::new(SimulatedSafetyOracle),
            congestion: CongestionTracker::new(base_fee),
        }
    }
}
