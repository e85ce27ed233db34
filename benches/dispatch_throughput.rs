use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use relayq::prelude::*;
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

fn post_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_and_drain");

    for count in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let total = Arc::new(AtomicU64::new(0));
            let sink = Arc::clone(&total);
            let dispatcher: QueuedDispatcher<u64> = QueuedDispatcher::with_handler(move |n: u64| {
                sink.fetch_add(black_box(n), Ordering::Relaxed);
                Outcome::Good
            });

            b.iter(|| {
                dispatcher.start().expect("dispatcher start");
                for n in 0..count {
                    dispatcher.post_message(n);
                }
                dispatcher.join_after_drain(Duration::from_micros(50))
            });
        });
    }

    group.finish();
}

fn post_only(c: &mut Criterion) {
    let dispatcher: QueuedDispatcher<u64> = QueuedDispatcher::new();

    c.bench_function("post_idle", |b| {
        b.iter(|| {
            dispatcher.post_message(black_box(7));
            if dispatcher.pending() > 100_000 {
                dispatcher.discard_pending();
            }
        })
    });
}

criterion_group!(benches, post_and_drain, post_only);
criterion_main!(benches);
