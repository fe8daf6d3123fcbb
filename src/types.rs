//! Common types used throughout the pipeline

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Microseconds since the Unix epoch.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Source category a signal originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalType {
    TwitterSentiment,
    SmartMoneyFlow,
    TechnicalBreakout,
    NewsCatalyst,
    WhaleMovement,
    MemecoinMomentum,
    ArbitrageOpportunity,
    LiquidationCascade,
}

/// Ordinal signal strength, scales the execution priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignalStrength {
    Weak = 1,
    Moderate = 2,
    Strong = 3,
    Extreme = 4,
}

impl SignalStrength {
    /// Numeric tier used by the priority formula.
    #[inline]
    pub fn weight(self) -> f64 {
        self as u8 as f64
    }
}

/// Latency tier a signal must be executed under. Higher tiers dequeue first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExecutionUrgency {
    /// ~100ms budget, full optimization
    LowLatency = 0,
    /// ~10ms budget
    HighFrequency = 1,
    /// ~1ms budget
    UltraFast = 2,
    /// Sub-millisecond budget, no routing
    Microsecond = 3,
}

impl ExecutionUrgency {
    /// Multiplier applied on top of strength and confidence when ranking.
    #[inline]
    pub fn priority_boost(self) -> f64 {
        match self {
            ExecutionUrgency::Microsecond => 4.0,
            ExecutionUrgency::UltraFast => 3.0,
            ExecutionUrgency::HighFrequency => 2.0,
            ExecutionUrgency::LowLatency => 1.0,
        }
    }
}

/// Trade side requested by a signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeDirection {
    #[default]
    Buy,
    Sell,
    Hold,
}

impl TradeDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
            TradeDirection::Hold => "hold",
        }
    }
}

/// A time-decaying trading signal flowing through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Unique signal id
    pub id: Uuid,

    /// Target token address
    pub token_address: String,

    /// Display symbol
    pub token_symbol: String,

    /// Source category
    pub signal_type: SignalType,

    /// Ordinal strength
    pub strength: SignalStrength,

    /// Latency tier for execution
    pub urgency: ExecutionUrgency,

    /// Aggregate sentiment in [-1.0, 1.0]
    pub sentiment_score: f64,

    /// Confidence in [0.0, 1.0], secondary queue sort key
    pub confidence: f64,

    /// Estimated price impact as a fraction
    pub expected_price_impact: f64,

    /// Position size in USD
    pub position_size: f64,

    /// Requested trade side
    pub direction: TradeDirection,

    /// Creation time, microseconds since epoch
    pub created_at_us: u64,

    /// Time-to-live after which the signal must not execute
    pub ttl: Duration,

    /// Feeds that contributed to this signal
    pub data_sources: Vec<String>,

    /// Execution constraints
    pub max_slippage_bps: f64,
    pub priority_fee_multiplier: f64,
    pub use_mev_protection: bool,
    pub allow_partial_fill: bool,

    /// Smart routing options
    pub preferred_venues: Vec<String>,
    pub enable_split_routing: bool,
    pub max_route_hops: u8,
}

impl Signal {
    /// Create a signal with neutral economics; callers fill in the rest.
    pub fn new(
        token_address: impl Into<String>,
        token_symbol: impl Into<String>,
        signal_type: SignalType,
        strength: SignalStrength,
        urgency: ExecutionUrgency,
        direction: TradeDirection,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_address: token_address.into(),
            token_symbol: token_symbol.into(),
            signal_type,
            strength,
            urgency,
            sentiment_score: 0.0,
            confidence: 0.0,
            expected_price_impact: 0.0,
            position_size: 0.0,
            direction,
            created_at_us: now_micros(),
            ttl: Duration::from_secs(5),
            data_sources: Vec::new(),
            max_slippage_bps: 50.0,
            priority_fee_multiplier: 1.0,
            use_mev_protection: false,
            allow_partial_fill: false,
            preferred_venues: Vec::new(),
            enable_split_routing: false,
            max_route_hops: 3,
        }
    }

    /// Age of the signal at `now_us`, saturating at zero for clock skew.
    #[inline]
    pub fn age_us(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.created_at_us)
    }

    /// A signal is expired once its age exceeds the ttl.
    #[inline]
    pub fn is_expired(&self, now_us: u64) -> bool {
        self.age_us(now_us) > self.ttl.as_micros() as u64
    }

    /// Ranking score used by upstream producers: strictly monotonic in
    /// strength and confidence, boosted by urgency tier.
    #[inline]
    pub fn execution_priority(&self) -> f64 {
        self.strength.weight() * self.confidence * self.urgency.priority_boost()
    }
}

/// Outcome of one dispatch attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Id of the dispatched signal
    pub signal_id: Uuid,

    /// Whether the attempt succeeded
    pub success: bool,

    /// Submitted transaction reference, if any
    pub tx_reference: Option<String>,

    /// Venue the attempt was routed to, if routing was reached
    pub venue: Option<String>,

    /// Fill price
    pub executed_price: f64,

    /// Fill quantity in token units
    pub executed_quantity: f64,

    /// Realized slippage in basis points
    pub slippage_bps: f64,

    /// Time from dequeue to completion, microseconds
    pub execution_latency_us: u64,

    /// Time from signal creation to completion, microseconds
    pub pipeline_latency_us: u64,

    /// Fee paid for the attempt
    pub fee: f64,

    /// Failure reason when `success` is false
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Failed result with zeroed economics, before any venue was reached.
    pub fn failed(signal_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            signal_id,
            success: false,
            tx_reference: None,
            venue: None,
            executed_price: 0.0,
            executed_quantity: 0.0,
            slippage_bps: 0.0,
            execution_latency_us: 0,
            pipeline_latency_us: 0,
            fee: 0.0,
            error: Some(reason.into()),
        }
    }
}
