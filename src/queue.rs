//! Priority queue feeding the execution workers
//!
//! Signals are ranked by urgency tier first and confidence second, with
//! insertion order as the deterministic tie-breaker. Consumers block on
//! `pop` until a signal arrives or the queue is stopped; stopping wakes
//! every blocked consumer and turns further pops into `QueueClosed` once
//! the remaining signals have drained.

use crate::errors::QueueClosed;
use crate::types::Signal;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Ranked {
    signal: Signal,
    seq: u64,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.signal
            .urgency
            .cmp(&other.signal.urgency)
            .then_with(|| self.signal.confidence.total_cmp(&other.signal.confidence))
            // Earlier insertion wins when both keys tie.
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueInner {
    heap: BinaryHeap<Ranked>,
    closed: bool,
    next_seq: u64,
}

/// Thread-safe priority queue with blocking consumption.
pub struct PrioritySignalQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl PrioritySignalQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                closed: false,
                next_seq: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Enqueue a signal. Rejected once the queue has been stopped.
    pub fn push(&self, signal: Signal) -> Result<(), QueueClosed> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(QueueClosed);
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Ranked { signal, seq });
        drop(inner);
        self.available.notify_one();
        Ok(())
    }

    /// Block until the highest-priority signal is available.
    ///
    /// Signals still queued when `stop` is called are drained before
    /// `QueueClosed` is returned.
    pub fn pop(&self) -> Result<Signal, QueueClosed> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(ranked) = inner.heap.pop() {
                return Ok(ranked.signal);
            }
            if inner.closed {
                return Err(QueueClosed);
            }
            self.available.wait(&mut inner);
        }
    }

    /// Non-blocking pop. Drains remaining signals even after `stop`.
    pub fn try_pop(&self) -> Option<Signal> {
        self.inner.lock().heap.pop().map(|r| r.signal)
    }

    /// Drop every queued signal, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.heap.len();
        inner.heap.clear();
        dropped
    }

    /// Clones of the queued signals, in no particular order.
    pub fn snapshot(&self) -> Vec<Signal> {
        self.inner
            .lock()
            .heap
            .iter()
            .map(|r| r.signal.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Stop the queue and wake every blocked consumer. Idempotent.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);
        self.available.notify_all();
    }
}

impl Default for PrioritySignalQueue {
    fn default() -> Self {
        Self::new()
    }
}
