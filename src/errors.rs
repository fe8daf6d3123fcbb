//! Error types for the pipeline

use thiserror::Error;

/// Returned by queue operations once the queue has been stopped.
///
/// This is the cancellation signal for blocked consumers; worker loops
/// treat it as a clean exit, never as a failure to report upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("signal queue closed")]
pub struct QueueClosed;

/// Why the safety gate refused a signal.
///
/// Carried on the failed `ExecutionResult` as its human-readable reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("signal expired: age {age_us}us exceeds ttl {ttl_us}us")]
    Expired { age_us: u64, ttl_us: u64 },

    #[error("emergency stop active")]
    KillSwitch,

    #[error("position size {size:.2} USD exceeds limit {max:.2} USD")]
    PositionLimit { size: f64, max: f64 },

    #[error("token {token} flagged unsafe")]
    UnsafeToken { token: String },

    /// Only produced when strict unknown-asset handling is enabled.
    #[error("token {token} has no safety verdict")]
    UnknownToken { token: String },
}

/// Lifecycle misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("pipeline already running")]
    AlreadyRunning,

    #[error("pipeline has been stopped and cannot be restarted")]
    Stopped,
}
