//! Callback registry and isolated invocation
//!
//! Consumers register one callback per signal type, one execution
//! callback, and one error callback. Callbacks run synchronously on the
//! thread that produced the event; a failing or panicking callback is
//! reported through the error callback and never unwinds into the caller.

use crate::types::{ExecutionResult, Signal, SignalType};
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

pub type SignalCallback = Arc<dyn Fn(&Signal) -> anyhow::Result<()> + Send + Sync>;
type ExecutionCallbackFn = Box<dyn Fn(&ExecutionResult) -> anyhow::Result<()> + Send + Sync>;
type ErrorCallbackFn = Box<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Default)]
pub struct CallbackRegistry {
    signal: DashMap<SignalType, SignalCallback>,
    execution: ArcSwapOption<ExecutionCallbackFn>,
    error: ArcSwapOption<ErrorCallbackFn>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback for one signal type, replacing any previous one.
    pub fn on_signal<F>(&self, signal_type: SignalType, callback: F)
    where
        F: Fn(&Signal) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.signal.insert(signal_type, Arc::new(callback));
    }

    /// Register the execution-result callback, replacing any previous one.
    pub fn on_execution<F>(&self, callback: F)
    where
        F: Fn(&ExecutionResult) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.execution.store(Some(Arc::new(Box::new(callback))));
    }

    /// Register the error callback invoked with `(context, message)`.
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.error.store(Some(Arc::new(Box::new(callback))));
    }

    /// Invoke the per-type callback for a freshly submitted signal.
    pub fn notify_signal(&self, signal: &Signal) {
        // Clone out of the map so the callback runs without the shard lock.
        let callback = self.signal.get(&signal.signal_type).map(|cb| cb.clone());
        if let Some(callback) = callback {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(signal)));
            self.report_failure("signal_callback", outcome);
        }
    }

    /// Invoke the execution callback for a completed dispatch.
    pub fn notify_execution(&self, result: &ExecutionResult) {
        if let Some(callback) = self.execution.load_full() {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(result)));
            self.report_failure("execution_callback", outcome);
        }
    }

    /// Route a failure to the error callback. The error callback itself is
    /// the last line: if it panics the event is only logged.
    pub fn notify_error(&self, context: &str, message: &str) {
        debug!(context, message, "reporting pipeline error");
        if let Some(callback) = self.error.load_full() {
            if catch_unwind(AssertUnwindSafe(|| callback(context, message))).is_err() {
                error!(context, "error callback panicked");
            }
        }
    }

    fn report_failure(
        &self,
        context: &str,
        outcome: Result<anyhow::Result<()>, Box<dyn std::any::Any + Send>>,
    ) {
        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic_message(&panic),
        };
        self.notify_error(context, &message);
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExecutionUrgency, SignalStrength, TradeDirection};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn signal(signal_type: SignalType) -> Signal {
        Signal::new(
            "mint",
            "TOK",
            signal_type,
            SignalStrength::Strong,
            ExecutionUrgency::HighFrequency,
            TradeDirection::Buy,
        )
    }

    #[test]
    fn test_signal_callbacks_fire_per_type() {
        let registry = CallbackRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_cb = Arc::clone(&hits);
        registry.on_signal(SignalType::TwitterSentiment, move |_| {
            hits_cb.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

        registry.notify_signal(&signal(SignalType::TwitterSentiment));
        registry.notify_signal(&signal(SignalType::NewsCatalyst));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_failed_callbacks_reach_the_error_callback() {
        let registry = CallbackRegistry::new();
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        registry.on_error(move |context, message| {
            seen_cb.lock().push((context.to_string(), message.to_string()));
        });
        registry.on_execution(|_| Err(anyhow::anyhow!("downstream unavailable")));

        let result = ExecutionResult::failed(uuid::Uuid::new_v4(), "x");
        registry.notify_execution(&result);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "execution_callback");
        assert!(seen[0].1.contains("downstream unavailable"));
    }

    #[test]
    fn test_panicking_callback_does_not_unwind_into_the_caller() {
        let registry = CallbackRegistry::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        registry.on_error(move |_, message| seen_cb.lock().push(message.to_string()));
        registry.on_signal(SignalType::WhaleMovement, |_| panic!("boom"));

        registry.notify_signal(&signal(SignalType::WhaleMovement));
        assert_eq!(seen.lock().as_slice(), ["boom"]);
    }

    #[test]
    fn test_registering_again_replaces_the_callback() {
        let registry = CallbackRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        registry.on_execution(|_| Ok(()));
        let hits_cb = Arc::clone(&hits);
        registry.on_execution(move |_| {
            hits_cb.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

        registry.notify_execution(&ExecutionResult::failed(uuid::Uuid::new_v4(), "x"));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_panicking_error_callback_is_contained() {
        let registry = CallbackRegistry::new();
        registry.on_error(|_, _| panic!("handler broke"));
        registry.notify_error("worker", "original failure");
    }
}
