//! Criterion benchmarks for whole-suite runs through the tick scheduler.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use gantry_bench::{bench_config, event_profile, polling_profile};
use gantry_core::{BlockPos, TickId, WorldEvent};
use gantry_engine::{SuiteRunner, TestFilter};
use gantry_test_utils::GridWorld;

/// Benchmark: 256 concurrent tests polling for 20 ticks each.
fn bench_polling_256(c: &mut Criterion) {
    let catalog = polling_profile(256, 20).unwrap();
    let runner = SuiteRunner::new(bench_config(256)).unwrap();

    c.bench_function("polling_256x20", |b| {
        b.iter(|| {
            let mut world = GridWorld::new();
            let report = runner
                .run(&catalog, &TestFilter::all(), &mut world)
                .unwrap();
            black_box(report.ticks);
        });
    });
}

/// Benchmark: the same workload squeezed through 8 concurrent slots.
fn bench_polling_throttled(c: &mut Criterion) {
    let catalog = polling_profile(256, 20).unwrap();
    let runner = SuiteRunner::new(bench_config(8)).unwrap();

    c.bench_function("polling_256x20_throttled", |b| {
        b.iter(|| {
            let mut world = GridWorld::new();
            let report = runner
                .run(&catalog, &TestFilter::all(), &mut world)
                .unwrap();
            black_box(report.ticks);
        });
    });
}

/// Benchmark: 128 subscribers receiving one broadcast and one positioned
/// event per tick for 30 ticks.
fn bench_event_fanout(c: &mut Criterion) {
    let catalog = event_profile(128, "pulse", 30).unwrap();
    let runner = SuiteRunner::new(bench_config(128)).unwrap();

    c.bench_function("event_fanout_128x30", |b| {
        b.iter(|| {
            let mut world = GridWorld::new();
            for t in 2..=31 {
                world.schedule_event(TickId(t), WorldEvent::new("pulse"));
                world.schedule_event(
                    TickId(t),
                    WorldEvent::new("pulse").at(BlockPos::new(4, 65, 4)),
                );
            }
            let report = runner
                .run(&catalog, &TestFilter::all(), &mut world)
                .unwrap();
            black_box(report.ticks);
        });
    });
}

criterion_group!(
    benches,
    bench_polling_256,
    bench_polling_throttled,
    bench_event_fanout
);
criterion_main!(benches);
