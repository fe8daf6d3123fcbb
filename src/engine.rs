//! Pipeline engine: worker pool, dispatch path, and control plane
//!
//! `ExecutionPipeline` owns every component and exposes the public
//! surface: signal submission, lifecycle control, pre-signing, callback
//! registration, and telemetry queries. Workers block on the priority
//! queue and run each dequeued signal through the safety gate, the
//! pre-signed fast path, and the urgency-matched strategy.

use crate::callbacks::CallbackRegistry;
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, QueueClosed, RejectReason};
use crate::feeds::{self, ShutdownLatch};
use crate::market::MarketContext;
use crate::presign::{PreSignedCache, RefreshOutcome};
use crate::queue::PrioritySignalQueue;
use crate::safety::SafetyGate;
use crate::strategy::{self, ExecutionStrategy};
use crate::telemetry::{MetricsSnapshot, PipelineMetrics, RecentExecutions};
use crate::types::{now_micros, ExecutionResult, Signal, SignalType, TradeDirection};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lifecycle state of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Stopped = 0,
    Running = 1,
    Paused = 2,
}

impl From<u8> for PipelineState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Stopped => "stopped",
            PipelineState::Running => "running",
            PipelineState::Paused => "paused",
        }
    }
}

/// Point-in-time operational summary
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub state: &'static str,
    pub healthy: bool,
    pub queue_depth: usize,
    pub congestion_level: f64,
    pub pending_network_txs: u64,
    pub recommended_fee: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub metrics: MetricsSnapshot,
}

struct PipelineInner {
    config: PipelineConfig,
    queue: PrioritySignalQueue,
    presign: PreSignedCache,
    gate: SafetyGate,
    market: MarketContext,
    metrics: PipelineMetrics,
    recent: RecentExecutions,
    callbacks: CallbackRegistry,
    state: AtomicU8,
    kill_switch: Arc<AtomicBool>,
    feed_latch: ShutdownLatch,
    started_at: Mutex<Option<DateTime<Utc>>>,
}

/// The signal-to-execution pipeline.
///
/// Signals may be submitted before `start`; they wait in the queue until
/// workers come up. The pipeline is single-shot: `stop` closes the queue
/// for good and a stopped pipeline cannot be started again.
pub struct ExecutionPipeline {
    inner: Arc<PipelineInner>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl ExecutionPipeline {
    /// Build a pipeline with simulated market collaborators.
    pub fn new(config: PipelineConfig) -> Self {
        let market = MarketContext::simulated(config.feeds.base_fee);
        Self::with_market(config, market)
    }

    /// Build against injected price, route, and safety collaborators.
    pub fn with_market(config: PipelineConfig, market: MarketContext) -> Self {
        let kill_switch = Arc::new(AtomicBool::new(false));
        let inner = PipelineInner {
            queue: PrioritySignalQueue::new(),
            presign: PreSignedCache::new(&config.presign),
            gate: SafetyGate::new(
                config.limits.max_position_usd,
                config.safety.strict_unknown_assets,
                Arc::clone(&kill_switch),
            ),
            market,
            metrics: PipelineMetrics::new(),
            recent: RecentExecutions::new(
                config.telemetry.recent_capacity,
                config.eviction_block(),
            ),
            callbacks: CallbackRegistry::new(),
            state: AtomicU8::new(PipelineState::Stopped as u8),
            kill_switch,
            feed_latch: ShutdownLatch::new(),
            started_at: Mutex::new(None),
            config,
        };

        for token in &inner.config.safety.warm_tokens {
            inner.warm_up(token);
        }

        Self {
            inner: Arc::new(inner),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Start the worker pool and the configured background feeders.
    pub fn start(&self) -> Result<(), PipelineError> {
        if self.inner.queue.is_closed() {
            return Err(PipelineError::Stopped);
        }
        if self
            .inner
            .state
            .compare_exchange(
                PipelineState::Stopped as u8,
                PipelineState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(PipelineError::AlreadyRunning);
        }

        self.inner.kill_switch.store(false, Ordering::Release);
        *self.inner.started_at.lock() = Some(Utc::now());

        let worker_count = self.inner.config.worker_count();
        let mut threads = self.threads.lock();
        for worker_id in 0..worker_count {
            let inner = Arc::clone(&self.inner);
            threads.push(thread::spawn(move || worker_loop(&inner, worker_id)));
        }

        if self.inner.config.feeds.enable_synthetic_signals {
            let inner = Arc::clone(&self.inner);
            let interval = Duration::from_millis(inner.config.feeds.signal_interval_ms);
            threads.push(thread::spawn(move || {
                feeds::run_signal_feed(&inner.feed_latch, interval, |signal| {
                    let _ = inner.submit(signal);
                });
            }));
        }
        if self.inner.config.feeds.enable_congestion_monitor {
            let inner = Arc::clone(&self.inner);
            let interval = Duration::from_millis(inner.config.feeds.congestion_interval_ms);
            threads.push(thread::spawn(move || {
                feeds::run_congestion_feed(&inner.feed_latch, interval, |level, pending| {
                    inner.market.congestion.observe(level, pending)
                });
            }));
        }

        info!(workers = worker_count, "pipeline started");
        Ok(())
    }

    /// Stop workers and feeders and wait for them to exit. Idempotent.
    pub fn stop(&self) {
        let previous = self
            .inner
            .state
            .swap(PipelineState::Stopped as u8, Ordering::AcqRel);
        self.inner.feed_latch.signal();
        self.inner.queue.stop();

        let handles: Vec<_> = self.threads.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }

        if PipelineState::from(previous) != PipelineState::Stopped {
            info!("pipeline stopped");
        }
    }

    /// Pause dispatch without dropping queued signals.
    ///
    /// Returns `false` unless the pipeline was running. Workers finish
    /// the signal in hand and then idle.
    pub fn pause(&self) -> bool {
        let paused = self
            .inner
            .state
            .compare_exchange(
                PipelineState::Running as u8,
                PipelineState::Paused as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if paused {
            info!("signal processing paused");
        }
        paused
    }

    /// Resume dispatch after `pause`.
    pub fn resume(&self) -> bool {
        let resumed = self
            .inner
            .state
            .compare_exchange(
                PipelineState::Paused as u8,
                PipelineState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if resumed {
            info!("signal processing resumed");
        }
        resumed
    }

    /// Engage the kill switch and drop every queued signal.
    ///
    /// Workers stay up but the gate rejects all signals until
    /// [`clear_emergency`](Self::clear_emergency) is called.
    pub fn emergency_stop(&self) {
        self.inner.kill_switch.store(true, Ordering::Release);
        let dropped = self.inner.queue.clear();
        warn!(dropped, "emergency stop engaged");
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.inner.kill_switch.load(Ordering::Acquire)
    }

    /// Disengage the kill switch and admit signals again.
    pub fn clear_emergency(&self) {
        self.inner.kill_switch.store(false, Ordering::Release);
        info!("emergency stop cleared");
    }

    /// Drop every queued signal, returning how many were discarded.
    pub fn clear_pending(&self) -> usize {
        self.inner.queue.clear()
    }

    /// Queue a signal for execution.
    pub fn submit_signal(&self, signal: Signal) -> Result<(), QueueClosed> {
        self.inner.submit(signal)
    }

    /// Run the admission checks a signal would face right now.
    pub fn check_signal(&self, signal: &Signal) -> Result<(), RejectReason> {
        self.inner.gate.check(signal, now_micros())
    }

    pub fn state(&self) -> PipelineState {
        self.inner.current_state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Most recent execution results, oldest first.
    pub fn recent_executions(&self, limit: usize) -> Vec<ExecutionResult> {
        self.inner.recent.recent(limit)
    }

    /// Clones of the queued signals, in no particular order.
    pub fn pending_signals(&self) -> Vec<Signal> {
        self.inner.queue.snapshot()
    }

    pub fn queue_depth(&self) -> usize {
        self.inner.queue.len()
    }

    /// Pre-sign a batch of payloads for instant execution on `token`.
    pub fn reserve_presigned(&self, token: &str, quantity: usize) {
        self.inner.presign.reserve(token, quantity);
    }

    pub fn has_presigned(&self, token: &str, direction: TradeDirection) -> bool {
        self.inner.presign.has_ready(token, direction)
    }

    /// Drop stale pre-signed payloads and refill shallow pools.
    pub fn refresh_presigned(&self) -> RefreshOutcome {
        self.inner.presign.refresh()
    }

    /// Cache the safety verdict and routes for a token before trading it.
    pub fn warm_up_token(&self, token: &str) {
        self.inner.warm_up(token);
    }

    /// Record an out-of-band safety verdict for a token.
    pub fn record_safety_verdict(&self, token: &str, safe: bool) {
        self.inner.gate.record_verdict(token, safe);
    }

    /// Adjust the position limit while running.
    pub fn set_max_position(&self, max_position_usd: f64) {
        self.inner.gate.set_max_position(max_position_usd);
    }

    /// Fee to attach to `signal` under current network conditions.
    pub fn optimal_priority_fee(&self, signal: &Signal) -> f64 {
        self.inner.market.congestion.optimal_priority_fee(signal)
    }

    /// Register the callback for one signal type.
    pub fn on_signal<F>(&self, signal_type: SignalType, callback: F)
    where
        F: Fn(&Signal) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.callbacks.on_signal(signal_type, callback);
    }

    /// Register the execution-result callback.
    pub fn on_execution<F>(&self, callback: F)
    where
        F: Fn(&ExecutionResult) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.callbacks.on_execution(callback);
    }

    /// Register the error callback invoked with `(context, message)`.
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_error(callback);
    }

    /// Whether the pipeline is live and executing at an acceptable rate.
    pub fn health_check(&self) -> bool {
        self.state() != PipelineState::Stopped
            && !self.is_emergency_stopped()
            && self.inner.metrics.success_rate() > self.inner.config.limits.health_success_floor
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            state: self.state().as_str(),
            healthy: self.health_check(),
            queue_depth: self.queue_depth(),
            congestion_level: self.inner.market.congestion.level(),
            pending_network_txs: self.inner.market.congestion.pending_transactions(),
            recommended_fee: self.inner.market.congestion.recommended_fee(),
            started_at: *self.inner.started_at.lock(),
            metrics: self.inner.metrics.snapshot(),
        }
    }

    /// Human-readable status summary.
    pub fn status_report(&self) -> String {
        let status = self.status();
        let started = status
            .started_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "Pipeline Status:\n  \
             State: {}\n  \
             Started: {}\n  \
             Signals Processed: {}\n  \
             Success Rate: {:.1}%\n  \
             Avg Execution Latency: {:.0}us\n  \
             Network Congestion: {:.0}%\n  \
             Queue Depth: {}",
            status.state,
            started,
            status.metrics.signals_processed,
            status.metrics.success_rate * 100.0,
            status.metrics.avg_execution_latency_us,
            status.congestion_level * 100.0,
            status.queue_depth,
        )
    }
}

impl Drop for ExecutionPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

impl PipelineInner {
    fn current_state(&self) -> PipelineState {
        PipelineState::from(self.state.load(Ordering::Acquire))
    }

    fn submit(&self, signal: Signal) -> Result<(), QueueClosed> {
        debug!(
            symbol = %signal.token_symbol,
            direction = signal.direction.as_str(),
            urgency = ?signal.urgency,
            confidence = signal.confidence,
            "signal submitted"
        );
        self.queue.push(signal.clone())?;
        self.callbacks.notify_signal(&signal);
        Ok(())
    }

    fn warm_up(&self, token: &str) {
        if let Some(safe) = self.market.safety.is_safe(token) {
            self.gate.record_verdict(token, safe);
        }
        let routes = self.market.routes.optimal_routes(token);
        debug!(token, routes = routes.len(), "token warmed up");
    }

    /// Gate the signal, then execute it over a prepared payload when one
    /// is cached, falling back to the urgency-matched strategy. Latencies
    /// are stamped on every result, rejections included.
    fn dispatch(&self, signal: Signal) -> ExecutionResult {
        let started = Instant::now();

        let mut result = match self.gate.check(&signal, now_micros()) {
            Err(reason) => {
                debug!(signal_id = %signal.id, %reason, "signal rejected");
                ExecutionResult::failed(signal.id, reason.to_string())
            }
            Ok(()) => match self.presign.take(&signal.token_address, signal.direction) {
                Some(prepared) => strategy::execute_presigned(&signal, &prepared, &self.market),
                None => {
                    ExecutionStrategy::for_urgency(signal.urgency).execute(&signal, &self.market)
                }
            },
        };

        if result.success
            && signal.use_mev_protection
            && self.market.congestion.level() > self.config.safety.mev_congestion_threshold
        {
            self.metrics.mev_attacks_blocked.fetch_add(1, Ordering::Relaxed);
        }

        result.execution_latency_us = started.elapsed().as_micros() as u64;
        result.pipeline_latency_us = now_micros().saturating_sub(signal.created_at_us);
        result
    }

    fn finish(&self, result: ExecutionResult) {
        self.metrics.record(&result);
        if result.success {
            debug!(
                signal_id = %result.signal_id,
                latency_us = result.execution_latency_us,
                venue = result.venue.as_deref().unwrap_or("-"),
                "signal executed"
            );
        } else {
            debug!(
                signal_id = %result.signal_id,
                error = result.error.as_deref().unwrap_or("-"),
                "signal failed"
            );
        }
        self.recent.push(result.clone());
        self.callbacks.notify_execution(&result);
    }
}

fn worker_loop(inner: &PipelineInner, worker_id: usize) {
    debug!(worker_id, "execution worker started");
    let poll = Duration::from_millis(inner.config.workers.poll_interval_ms);

    'run: loop {
        match inner.current_state() {
            PipelineState::Stopped => break,
            PipelineState::Paused => {
                thread::sleep(poll);
                continue;
            }
            PipelineState::Running => {}
        }
        if inner.kill_switch.load(Ordering::Acquire) {
            thread::sleep(poll);
            continue;
        }

        let signal = match inner.queue.pop() {
            Ok(signal) => signal,
            Err(QueueClosed) => break,
        };

        // A pause can land between the pop and the dispatch. Hold the
        // signal until resumed; drop it if the pipeline stops instead.
        loop {
            match inner.current_state() {
                PipelineState::Stopped => break 'run,
                PipelineState::Paused => thread::sleep(poll),
                PipelineState::Running => break,
            }
        }

        let result = inner.dispatch(signal);
        inner.finish(result);
    }

    debug!(worker_id, "execution worker stopped");
}
