//! Integration tests for the signal execution pipeline
//!
//! These tests validate:
//! - End-to-end dispatch ordering by urgency
//! - Staleness rejection on the dispatch path
//! - The pre-signed fast path
//! - Emergency stop and recovery
//! - Metrics aggregation across mixed outcomes

use parking_lot::Mutex;
use sigflow::{
    ExecutionPipeline, ExecutionUrgency, PipelineConfig, Signal, SignalStrength, SignalType,
    TradeDirection,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn quiet_config(workers: usize) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.workers.count = workers;
    config.workers.poll_interval_ms = 5;
    config.feeds.enable_synthetic_signals = false;
    config.feeds.enable_congestion_monitor = false;
    config.safety.warm_tokens.clear();
    config
}

// Extreme strength keeps the modeled success rate clamped at 1.0 while
// congestion stays at zero, so outcomes are deterministic.
fn signal(urgency: ExecutionUrgency) -> Signal {
    let mut signal = Signal::new(
        "mint",
        "TOK",
        SignalType::SmartMoneyFlow,
        SignalStrength::Extreme,
        urgency,
        TradeDirection::Buy,
    );
    signal.confidence = 0.9;
    signal.position_size = 1_000.0;
    signal
}

fn wait_until(timeout_ms: u64, predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

#[test]
fn test_dispatch_follows_urgency_order() {
    let pipeline = ExecutionPipeline::new(quiet_config(1));

    // Queue before starting so the single worker drains by priority.
    let low = signal(ExecutionUrgency::LowLatency);
    let micro = signal(ExecutionUrgency::Microsecond);
    let high = signal(ExecutionUrgency::HighFrequency);
    let expected = vec![micro.id, high.id, low.id];

    pipeline.submit_signal(low).unwrap();
    pipeline.submit_signal(micro).unwrap();
    pipeline.submit_signal(high).unwrap();

    let order: Arc<Mutex<Vec<uuid::Uuid>>> = Arc::new(Mutex::new(Vec::new()));
    let order_sink = Arc::clone(&order);
    pipeline.on_execution(move |result| {
        order_sink.lock().push(result.signal_id);
        Ok(())
    });

    pipeline.start().unwrap();
    assert!(wait_until(2_000, || pipeline.metrics().signals_processed == 3));
    pipeline.stop();

    assert_eq!(*order.lock(), expected);
}

#[test]
fn test_stale_signal_is_rejected_with_reason() {
    let pipeline = ExecutionPipeline::new(quiet_config(1));
    pipeline.start().unwrap();

    let mut stale = signal(ExecutionUrgency::HighFrequency);
    stale.confidence = 0.5;
    stale.ttl = Duration::from_secs(1);
    stale.created_at_us = stale.created_at_us.saturating_sub(2_000_000);
    let stale_id = stale.id;
    pipeline.submit_signal(stale).unwrap();

    assert!(wait_until(2_000, || pipeline.metrics().signals_processed == 1));
    pipeline.stop();

    let recent = pipeline.recent_executions(1);
    assert_eq!(recent[0].signal_id, stale_id);
    assert!(!recent[0].success);
    let reason = recent[0].error.clone().unwrap_or_default();
    assert!(reason.contains("expired"), "unexpected reason: {reason}");
    assert_eq!(pipeline.metrics().signals_rejected, 1);
}

#[test]
fn test_presigned_cache_serves_the_fast_path() {
    let pipeline = ExecutionPipeline::new(quiet_config(1));
    pipeline.reserve_presigned("mint", 3);
    assert!(pipeline.has_presigned("mint", TradeDirection::Buy));
    assert!(pipeline.has_presigned("mint", TradeDirection::Sell));

    pipeline.start().unwrap();
    pipeline
        .submit_signal(signal(ExecutionUrgency::UltraFast))
        .unwrap();

    assert!(wait_until(2_000, || pipeline.metrics().signals_processed == 1));
    pipeline.stop();

    let recent = pipeline.recent_executions(1);
    assert!(recent[0].success);
    assert_eq!(recent[0].venue.as_deref(), Some("Raydium_PreSigned"));
    assert_eq!(recent[0].slippage_bps, 2.0);
    assert!(recent[0]
        .tx_reference
        .as_deref()
        .unwrap_or("")
        .starts_with("pre_signed_"));
}

#[test]
fn test_emergency_stop_blocks_execution_until_cleared() {
    let pipeline = ExecutionPipeline::new(quiet_config(2));
    pipeline.start().unwrap();

    pipeline.emergency_stop();
    for _ in 0..3 {
        pipeline
            .submit_signal(signal(ExecutionUrgency::Microsecond))
            .unwrap();
    }
    std::thread::sleep(Duration::from_millis(80));

    // Nothing may execute while the kill switch is engaged; queued
    // signals either wait or come back as kill-switch rejections.
    let snapshot = pipeline.metrics();
    assert_eq!(snapshot.signals_executed, 0);
    assert_eq!(snapshot.signals_processed, snapshot.signals_rejected);

    pipeline.clear_emergency();
    pipeline
        .submit_signal(signal(ExecutionUrgency::Microsecond))
        .unwrap();
    assert!(wait_until(2_000, || pipeline.metrics().signals_executed >= 1));
    pipeline.stop();
}

#[test]
fn test_metrics_track_mixed_outcomes() {
    let pipeline = ExecutionPipeline::new(quiet_config(1));
    pipeline.start().unwrap();

    for _ in 0..4 {
        pipeline
            .submit_signal(signal(ExecutionUrgency::Microsecond))
            .unwrap();
    }
    let mut oversized = signal(ExecutionUrgency::Microsecond);
    oversized.position_size = 1_000_000.0;
    pipeline.submit_signal(oversized).unwrap();

    assert!(wait_until(2_000, || pipeline.metrics().signals_processed == 5));
    pipeline.stop();

    let snapshot = pipeline.metrics();
    assert_eq!(snapshot.signals_executed, 4);
    assert_eq!(snapshot.signals_rejected, 1);
    assert!((snapshot.success_rate - 0.8).abs() < 1e-9);
    assert_eq!(pipeline.recent_executions(10).len(), 5);
}

#[test]
fn test_signal_and_error_callbacks_fire() {
    let pipeline = ExecutionPipeline::new(quiet_config(1));

    let signal_hits = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&signal_hits);
    pipeline.on_signal(SignalType::SmartMoneyFlow, move |_| {
        hits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    });

    let errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let error_sink = Arc::clone(&errors);
    pipeline.on_error(move |context, _message| {
        error_sink.lock().push(context.to_string());
    });
    pipeline.on_execution(|_| Err(anyhow::anyhow!("downstream rejected")));

    pipeline.start().unwrap();
    pipeline
        .submit_signal(signal(ExecutionUrgency::Microsecond))
        .unwrap();
    assert!(wait_until(2_000, || pipeline.metrics().signals_processed == 1));
    pipeline.stop();

    assert_eq!(signal_hits.load(Ordering::Relaxed), 1);
    assert_eq!(errors.lock().as_slice(), ["execution_callback"]);
}

#[test]
fn test_priority_fee_tracks_urgency() {
    let config = quiet_config(1);
    let base = config.feeds.base_fee;
    let pipeline = ExecutionPipeline::new(config);

    let fee = pipeline.optimal_priority_fee(&signal(ExecutionUrgency::Microsecond));
    assert!((fee - base * 5.0).abs() < 1e-15);

    let fee = pipeline.optimal_priority_fee(&signal(ExecutionUrgency::LowLatency));
    assert!((fee - base).abs() < 1e-15);
}
