//! Background feeders: synthetic signal sources and the congestion monitor
//!
//! The signal feed rolls each source once per cycle and submits the
//! generated signal when it clears the source's confidence floor. The
//! congestion feed samples synthetic network conditions once per cycle.
//! Both loops sleep on a shutdown latch so `stop` joins promptly. In
//! production the generators are replaced by real market-data
//! collaborators feeding `submit_signal` directly.

use crate::types::{
    ExecutionUrgency, Signal, SignalStrength, SignalType, TradeDirection,
};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One-shot latch that interruptibly bounds feeder sleeps.
pub struct ShutdownLatch {
    signaled: Mutex<bool>,
    cv: Condvar,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Trip the latch and wake every sleeper. Idempotent.
    pub fn signal(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        drop(signaled);
        self.cv.notify_all();
    }

    /// Sleep up to `timeout`, returning `true` once the latch is tripped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock();
        while !*signaled {
            if self.cv.wait_until(&mut signaled, deadline).timed_out() {
                break;
            }
        }
        *signaled
    }

    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }
}

impl Default for ShutdownLatch {
    fn default() -> Self {
        Self::new()
    }
}

struct SourceProfile {
    name: &'static str,
    /// Chance of emitting a signal per cycle
    chance: f64,
    /// Generated signals below this confidence are discarded
    confidence_floor: f64,
    generate: fn() -> Signal,
}

const SOURCES: [SourceProfile; 4] = [
    SourceProfile {
        name: "twitter",
        chance: 0.05,
        confidence_floor: 0.7,
        generate: synthetic_twitter_signal,
    },
    SourceProfile {
        name: "smart_money",
        chance: 0.03,
        confidence_floor: 0.8,
        generate: synthetic_smart_money_signal,
    },
    SourceProfile {
        name: "technical",
        chance: 0.04,
        confidence_floor: 0.6,
        generate: synthetic_technical_signal,
    },
    SourceProfile {
        name: "news",
        chance: 0.02,
        confidence_floor: 0.75,
        generate: synthetic_news_signal,
    },
];

/// Poll the synthetic sources until the latch trips.
pub fn run_signal_feed(latch: &ShutdownLatch, interval: Duration, submit: impl Fn(Signal)) {
    info!("signal feed started");
    loop {
        for source in &SOURCES {
            if fastrand::f64() < source.chance {
                let signal = (source.generate)();
                if signal.confidence > source.confidence_floor {
                    debug!(
                        source = source.name,
                        symbol = %signal.token_symbol,
                        confidence = signal.confidence,
                        "synthetic signal emitted"
                    );
                    submit(signal);
                }
            }
        }
        if latch.wait_timeout(interval) {
            break;
        }
    }
    info!("signal feed stopped");
}

/// Sample synthetic network conditions until the latch trips.
pub fn run_congestion_feed(latch: &ShutdownLatch, interval: Duration, observe: impl Fn(f64, u64)) {
    info!("congestion feed started");
    loop {
        observe(uniform(0.1, 0.9), fastrand::u64(100..10_000));
        if latch.wait_timeout(interval) {
            break;
        }
    }
    info!("congestion feed stopped");
}

fn uniform(lo: f64, hi: f64) -> f64 {
    lo + fastrand::f64() * (hi - lo)
}

fn random_strength() -> SignalStrength {
    match fastrand::u8(1..5) {
        1 => SignalStrength::Weak,
        2 => SignalStrength::Moderate,
        3 => SignalStrength::Strong,
        _ => SignalStrength::Extreme,
    }
}

fn synthetic_twitter_signal() -> Signal {
    let sentiment = uniform(-1.0, 1.0);
    let direction = if sentiment > 0.0 {
        TradeDirection::Buy
    } else {
        TradeDirection::Sell
    };

    let mut signal = Signal::new(
        format!("sample_token_{}", fastrand::u32(..100)),
        format!("TOK{}", fastrand::u32(..100)),
        SignalType::TwitterSentiment,
        random_strength(),
        ExecutionUrgency::HighFrequency,
        direction,
    );
    signal.sentiment_score = sentiment;
    signal.confidence = uniform(0.3, 0.95);
    signal.expected_price_impact = uniform(0.01, 0.1);
    signal.position_size = uniform(1_000.0, 50_000.0);
    signal.ttl = Duration::from_secs(5);
    signal.data_sources = vec!["twitter_stream".to_string(), "sentiment_ai".to_string()];
    signal.max_slippage_bps = 30.0;
    signal.priority_fee_multiplier = 2.0;
    signal.use_mev_protection = true;
    signal
}

fn synthetic_smart_money_signal() -> Signal {
    let mut signal = synthetic_twitter_signal();
    signal.signal_type = SignalType::SmartMoneyFlow;
    signal.urgency = ExecutionUrgency::UltraFast;
    signal.confidence = (signal.confidence + 0.2).min(1.0);
    signal.data_sources = vec!["gmgn_api".to_string(), "whale_tracker".to_string()];
    signal.ttl = Duration::from_secs(2);
    signal
}

fn synthetic_technical_signal() -> Signal {
    let mut signal = synthetic_twitter_signal();
    signal.signal_type = SignalType::TechnicalBreakout;
    signal.urgency = ExecutionUrgency::HighFrequency;
    signal.data_sources = vec!["price_feed".to_string(), "volume_analyzer".to_string()];
    signal.ttl = Duration::from_secs(10);
    signal
}

fn synthetic_news_signal() -> Signal {
    let mut signal = synthetic_twitter_signal();
    signal.signal_type = SignalType::NewsCatalyst;
    signal.urgency = ExecutionUrgency::Microsecond;
    signal.confidence = (signal.confidence + 0.1).min(1.0);
    signal.data_sources = vec!["news_feed".to_string(), "crypto_news_ai".to_string()];
    signal.ttl = Duration::from_secs(1);
    signal
}
