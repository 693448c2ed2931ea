//! Criterion micro-benchmarks for region placement and frame transforms.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use gantry_bench::{bench_config, footprint_requests};
use gantry_core::{BlockPos, InstanceId};
use gantry_space::{PlacementManager, PlacementRequest};

/// Benchmark: place 200 mixed footprints on an empty 1024x1024 grid.
fn bench_place_200(c: &mut Criterion) {
    let requests = footprint_requests(200, 42);
    let config = bench_config(200).placement;

    c.bench_function("place_200_mixed", |b| {
        b.iter(|| {
            let mut manager = PlacementManager::new(config.clone());
            for (i, request) in requests.iter().enumerate() {
                let placement = manager.place(InstanceId(i as u64), request).unwrap();
                black_box(placement);
            }
        });
    });
}

/// Benchmark: churn a half-full grid by releasing and re-placing regions.
fn bench_place_release_churn(c: &mut Criterion) {
    let requests: Vec<PlacementRequest> = footprint_requests(100, 7);
    let config = bench_config(100).placement;

    c.bench_function("place_release_churn_100", |b| {
        b.iter(|| {
            let mut manager = PlacementManager::new(config.clone());
            for (i, request) in requests.iter().enumerate() {
                manager.place(InstanceId(i as u64), request).unwrap();
            }
            for (i, request) in requests.iter().enumerate() {
                let id = InstanceId(i as u64);
                manager.release(id);
                let placement = manager.place(id, request).unwrap();
                black_box(placement);
            }
        });
    });
}

/// Benchmark: map every block of a rotated 16x8x16 structure to world
/// coordinates and back.
fn bench_frame_round_trip(c: &mut Criterion) {
    let requests = footprint_requests(1, 3);
    let mut manager = PlacementManager::new(bench_config(1).placement);
    let frame = manager.place(InstanceId(0), &requests[0]).unwrap().frame;

    c.bench_function("frame_round_trip_2k", |b| {
        b.iter(|| {
            for x in 0..16 {
                for y in 0..8 {
                    for z in 0..16 {
                        let abs = frame.world_location(BlockPos::new(x, y, z));
                        black_box(frame.relative_location(abs));
                    }
                }
            }
        });
    });
}

criterion_group!(
    benches,
    bench_place_200,
    bench_place_release_churn,
    bench_frame_round_trip
);
criterion_main!(benches);
