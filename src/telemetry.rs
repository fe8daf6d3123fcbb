//! Pipeline telemetry: atomic counters, exact running means, and the
//! bounded recent-results ring
//!
//! Counter updates are serialized by a small mutex so the incremental
//! mean `M' = (M * (n - 1) + x) / n` is exact for the observed sequence;
//! every value is also readable lock-free, so snapshots never block a
//! worker.

use crate::types::ExecutionResult;
use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic metrics for zero-overhead reads in the hot path
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Results recorded, successful or not
    pub signals_processed: AtomicU64,
    /// Successfully executed signals
    pub signals_executed: AtomicU64,
    /// Gate rejections and execution failures
    pub signals_rejected: AtomicU64,
    /// Times MEV protection engaged under high congestion
    pub mev_attacks_blocked: AtomicU64,

    avg_execution_latency_us: AtomicCell<f64>,
    avg_pipeline_latency_us: AtomicCell<f64>,
    success_rate: AtomicCell<f64>,

    /// Serializes `record` so the means are exact.
    update_lock: Mutex<()>,
}

/// Point-in-time copy of the metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub signals_processed: u64,
    pub signals_executed: u64,
    pub signals_rejected: u64,
    pub mev_attacks_blocked: u64,
    pub avg_execution_latency_us: f64,
    pub avg_pipeline_latency_us: f64,
    pub success_rate: f64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            signals_processed: AtomicU64::new(0),
            signals_executed: AtomicU64::new(0),
            signals_rejected: AtomicU64::new(0),
            mev_attacks_blocked: AtomicU64::new(0),
            avg_execution_latency_us: AtomicCell::new(0.0),
            avg_pipeline_latency_us: AtomicCell::new(0.0),
            success_rate: AtomicCell::new(0.0),
            update_lock: Mutex::new(()),
        }
    }

    /// Fold one result into the counters, means, and success rate.
    pub fn record(&self, result: &ExecutionResult) {
        let _guard = self.update_lock.lock();

        let n = self.signals_processed.fetch_add(1, Ordering::Relaxed) + 1;
        if result.success {
            self.signals_executed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.signals_rejected.fetch_add(1, Ordering::Relaxed);
        }

        let n_f = n as f64;
        let exec = self.avg_execution_latency_us.load();
        self.avg_execution_latency_us
            .store((exec * (n_f - 1.0) + result.execution_latency_us as f64) / n_f);

        let pipe = self.avg_pipeline_latency_us.load();
        self.avg_pipeline_latency_us
            .store((pipe * (n_f - 1.0) + result.pipeline_latency_us as f64) / n_f);

        self.success_rate
            .store(self.signals_executed.load(Ordering::Relaxed) as f64 / n_f);
    }

    /// Success fraction over everything processed so far; 0.0 before the
    /// first result.
    #[inline]
    pub fn success_rate(&self) -> f64 {
        self.success_rate.load()
    }

    /// Lock-free copy of every metric.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            signals_processed: self.signals_processed.load(Ordering::Relaxed),
            signals_executed: self.signals_executed.load(Ordering::Relaxed),
            signals_rejected: self.signals_rejected.load(Ordering::Relaxed),
            mev_attacks_blocked: self.mev_attacks_blocked.load(Ordering::Relaxed),
            avg_execution_latency_us: self.avg_execution_latency_us.load(),
            avg_pipeline_latency_us: self.avg_pipeline_latency_us.load(),
            success_rate: self.success_rate.load(),
        }
    }

    /// Reset all counters (useful for testing)
    pub fn reset(&self) {
        let _guard = self.update_lock.lock();
        self.signals_processed.store(0, Ordering::Relaxed);
        self.signals_executed.store(0, Ordering::Relaxed);
        self.signals_rejected.store(0, Ordering::Relaxed);
        self.mev_attacks_blocked.store(0, Ordering::Relaxed);
        self.avg_execution_latency_us.store(0.0);
        self.avg_pipeline_latency_us.store(0.0);
        self.success_rate.store(0.0);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded buffer of the most recent execution results.
///
/// When a push would exceed capacity the oldest block is evicted in one
/// batch rather than one element per push.
#[derive(Debug)]
pub struct RecentExecutions {
    buf: Mutex<VecDeque<ExecutionResult>>,
    capacity: usize,
    eviction_block: usize,
}

impl RecentExecutions {
    pub fn new(capacity: usize, eviction_block: usize) -> Self {
        Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            eviction_block: eviction_block.clamp(1, capacity.max(1)),
        }
    }

    pub fn push(&self, result: ExecutionResult) {
        let mut buf = self.buf.lock();
        if buf.len() >= self.capacity {
            let k = self.eviction_block.min(buf.len());
            buf.drain(..k);
        }
        buf.push_back(result);
    }

    /// Newest `limit` results in chronological order.
    pub fn recent(&self, limit: usize) -> Vec<ExecutionResult> {
        let buf = self.buf.lock();
        let skip = buf.len().saturating_sub(limit);
        buf.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }
}
