//! Priority-scheduled signal-to-execution pipeline
//!
//! Trading signals enter a priority queue ordered by urgency and
//! confidence, pass a safety gate, and are dispatched by a worker pool
//! through latency-tiered execution strategies, with a pre-signed
//! transaction cache serving the hottest path.

pub mod callbacks;
pub mod config;
pub mod engine;
pub mod errors;
pub mod feeds;
pub mod market;
pub mod presign;
pub mod queue;
pub mod safety;
pub mod strategy;
pub mod telemetry;
pub mod types;

// Re-export the types callers touch on every interaction
pub use config::PipelineConfig;
pub use engine::{ExecutionPipeline, PipelineState, PipelineStatus};
pub use errors::{PipelineError, QueueClosed, RejectReason};
pub use types::{
    ExecutionResult, ExecutionUrgency, Signal, SignalStrength, SignalType, TradeDirection,
};
