//! Safety gate run before any execution attempt
//!
//! Checks run synchronously on the dispatching worker in a fixed order,
//! short-circuiting on the first violation: freshness, kill switch,
//! position limit, then the cached asset verdict. Tokens without a cached
//! verdict are admissible unless strict mode is enabled.

use crate::errors::RejectReason;
use crate::types::Signal;
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

pub struct SafetyGate {
    /// Inclusive admission boundary in USD, adjustable at runtime.
    max_position_usd: AtomicCell<f64>,
    strict_unknown: bool,
    kill_switch: Arc<AtomicBool>,
    verdicts: DashMap<String, bool>,
}

impl SafetyGate {
    pub fn new(max_position_usd: f64, strict_unknown: bool, kill_switch: Arc<AtomicBool>) -> Self {
        Self {
            max_position_usd: AtomicCell::new(max_position_usd),
            strict_unknown,
            kill_switch,
            verdicts: DashMap::new(),
        }
    }

    /// Validate a signal, reporting the first violated check.
    pub fn check(&self, signal: &Signal, now_us: u64) -> Result<(), RejectReason> {
        let age_us = signal.age_us(now_us);
        let ttl_us = signal.ttl.as_micros() as u64;
        if age_us > ttl_us {
            return Err(RejectReason::Expired { age_us, ttl_us });
        }

        if self.kill_switch.load(Ordering::Acquire) {
            return Err(RejectReason::KillSwitch);
        }

        let max = self.max_position_usd.load();
        if signal.position_size > max {
            return Err(RejectReason::PositionLimit {
                size: signal.position_size,
                max,
            });
        }

        match self.verdicts.get(&signal.token_address).map(|v| *v) {
            Some(false) => Err(RejectReason::UnsafeToken {
                token: signal.token_address.clone(),
            }),
            None if self.strict_unknown => Err(RejectReason::UnknownToken {
                token: signal.token_address.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Boolean admission surface over `check`.
    #[inline]
    pub fn admit(&self, signal: &Signal) -> bool {
        self.check(signal, crate::types::now_micros()).is_ok()
    }

    /// Record an oracle verdict for a token. Overwrites any previous one.
    pub fn record_verdict(&self, token: &str, safe: bool) {
        if !safe {
            warn!(token, "token flagged unsafe");
        }
        self.verdicts.insert(token.to_string(), safe);
    }

    /// Cached verdict, `None` when the token was never assessed.
    pub fn verdict(&self, token: &str) -> Option<bool> {
        self.verdicts.get(token).map(|v| *v)
    }

    pub fn set_max_position(&self, max_position_usd: f64) {
        self.max_position_usd.store(max_position_usd);
    }

    pub fn max_position(&self) -> f64 {
        self.max_position_usd.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        now_micros, ExecutionUrgency, SignalStrength, SignalType, TradeDirection,
    };
    use std::time::Duration;

    fn gate(max: f64, strict: bool) -> (SafetyGate, Arc<AtomicBool>) {
        let kill = Arc::new(AtomicBool::new(false));
        (SafetyGate::new(max, strict, Arc::clone(&kill)), kill)
    }

    fn signal(position: f64) -> Signal {
        let mut s = Signal::new(
            "mint",
            "TOK",
            SignalType::SmartMoneyFlow,
            SignalStrength::Strong,
            ExecutionUrgency::UltraFast,
            TradeDirection::Buy,
        );
        s.position_size = position;
        s.confidence = 0.9;
        s
    }

    #[test]
    fn test_fresh_signal_within_limits_is_admitted() {
        let (gate, _) = gate(100_000.0, false);
        assert!(gate.admit(&signal(1_000.0)));
    }

    #[test]
    fn test_zero_ttl_signal_is_always_rejected() {
        let (gate, _) = gate(100_000.0, false);
        let mut s = signal(1_000.0);
        s.ttl = Duration::ZERO;
        let err = gate.check(&s, now_micros() + 1).unwrap_err();
        assert!(matches!(err, RejectReason::Expired { .. }));
    }

    #[test]
    fn test_freshness_is_checked_before_the_kill_switch() {
        let (gate, kill) = gate(100_000.0, false);
        kill.store(true, Ordering::Release);
        let mut s = signal(1_000.0);
        s.ttl = Duration::ZERO;
        let err = gate.check(&s, now_micros() + 1).unwrap_err();
        assert!(matches!(err, RejectReason::Expired { .. }));
    }

    #[test]
    fn test_kill_switch_rejects_everything() {
        let (gate, kill) = gate(100_000.0, false);
        kill.store(true, Ordering::Release);
        let err = gate.check(&signal(1.0), now_micros()).unwrap_err();
        assert_eq!(err, RejectReason::KillSwitch);

        kill.store(false, Ordering::Release);
        assert!(gate.admit(&signal(1.0)));
    }

    #[test]
    fn test_position_boundary_is_inclusive() {
        let (gate, _) = gate(100_000.0, false);
        assert!(gate.admit(&signal(100_000.0)));

        let err = gate.check(&signal(100_000.01), now_micros()).unwrap_err();
        assert!(matches!(err, RejectReason::PositionLimit { .. }));
    }

    #[test]
    fn test_max_position_is_runtime_adjustable() {
        let (gate, _) = gate(100_000.0, false);
        gate.set_max_position(500.0);
        assert!(!gate.admit(&signal(1_000.0)));
        assert!(gate.admit(&signal(500.0)));
    }

    #[test]
    fn test_only_explicit_unsafe_verdicts_reject() {
        let (gate, _) = gate(100_000.0, false);
        // No verdict recorded: admissible.
        assert!(gate.admit(&signal(1.0)));

        gate.record_verdict("mint", false);
        let err = gate.check(&signal(1.0), now_micros()).unwrap_err();
        assert!(matches!(err, RejectReason::UnsafeToken { .. }));

        gate.record_verdict("mint", true);
        assert!(gate.admit(&signal(1.0)));
    }

    #[test]
    fn test_strict_mode_rejects_unknown_tokens() {
        let (gate, _) = gate(100_000.0, true);
        let err = gate.check(&signal(1.0), now_micros()).unwrap_err();
        assert!(matches!(err, RejectReason::UnknownToken { .. }));

        gate.record_verdict("mint", true);
        assert!(gate.admit(&signal(1.0)));
    }
}
