//! Benchmark for priority queue throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sigflow::queue::PrioritySignalQueue;
use sigflow::{ExecutionUrgency, Signal, SignalStrength, SignalType, TradeDirection};

fn make_signal(urgency: ExecutionUrgency) -> Signal {
    let mut signal = Signal::new(
        "So11111111111111111111111111111111111111112",
        "SOL",
        SignalType::TwitterSentiment,
        SignalStrength::Strong,
        urgency,
        TradeDirection::Buy,
    );
    signal.confidence = fastrand::f64();
    signal
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");

    for depth in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("push", depth), depth, |b, &depth| {
            b.iter(|| {
                let queue = PrioritySignalQueue::new();
                for _ in 0..depth {
                    queue
                        .push(black_box(make_signal(ExecutionUrgency::HighFrequency)))
                        .unwrap();
                }
                black_box(queue.len())
            });
        });
    }

    group.finish();
}

fn bench_push_pop_interleaved(c: &mut Criterion) {
    c.bench_function("push_try_pop_interleaved", |b| {
        let queue = PrioritySignalQueue::new();
        b.iter(|| {
            queue
                .push(black_box(make_signal(ExecutionUrgency::Microsecond)))
                .unwrap();
            queue
                .push(black_box(make_signal(ExecutionUrgency::LowLatency)))
                .unwrap();
            black_box(queue.try_pop());
            black_box(queue.try_pop());
        });
    });
}

fn bench_execution_priority(c: &mut Criterion) {
    let signal = make_signal(ExecutionUrgency::UltraFast);

    c.bench_function("execution_priority", |b| {
        b.iter(|| black_box(signal.execution_priority()));
    });
}

criterion_group!(
    benches,
    bench_push,
    bench_push_pop_interleaved,
    bench_execution_priority
);
criterion_main!(benches);
