//! Benchmark profiles and utilities for the Gantry test harness.
//!
//! Provides pre-built catalogs and placement workloads for benchmarking:
//!
//! - [`polling_profile`]: many concurrent tests each polling a predicate
//! - [`event_profile`]: tests that subscribe to a busy event topic
//! - [`bench_config`]: a harness configuration with a large grid
//! - [`footprint_requests`]: deterministic mixed-size placement requests

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use gantry_core::{BlockPos, Extent, Rotation};
use gantry_engine::{ConfigError, HarnessConfig, TestCatalog, TestRegistry};
use gantry_space::{PlacementConfig, PlacementRequest, RotationPolicy};

/// Suite name used by every benchmark profile.
pub const BENCH_SUITE: &str = "bench";

/// Build a catalog of `tests` tests that each poll until their instance
/// clock passes `settle_ticks`, then succeed.
///
/// With enough concurrency every test finishes on global tick
/// `settle_ticks + 1`.
pub fn polling_profile(tests: usize, settle_ticks: u64) -> Result<TestCatalog, ConfigError> {
    let mut registry = TestRegistry::new();
    for i in 0..tests {
        registry
            .register(BENCH_SUITE, format!("poll_{i}"), move |ctx| {
                ctx.start_sequence()
                    .then_wait(move |ctx| ctx.assert(ctx.tick().0 > settle_ticks, "still settling"))
                    .then_succeed();
                Ok(())
            })?
            .max_ticks(settle_ticks + 10);
    }
    registry.freeze()
}

/// Build a catalog of `tests` tests that each count `topic` events and
/// succeed after `events_needed` of them.
pub fn event_profile(
    tests: usize,
    topic: &'static str,
    events_needed: u64,
) -> Result<TestCatalog, ConfigError> {
    let mut registry = TestRegistry::new();
    for i in 0..tests {
        registry
            .register(BENCH_SUITE, format!("listen_{i}"), move |ctx| {
                let mut seen = 0u64;
                ctx.subscribe(topic, move |ctx, _event| {
                    seen += 1;
                    if seen >= events_needed {
                        ctx.succeed();
                    }
                    Ok(())
                });
                Ok(())
            })?
            .max_ticks(events_needed + 10);
    }
    registry.freeze()
}

/// Harness configuration for benchmarks: a 1024x1024 grid and the given
/// concurrency limit.
pub fn bench_config(max_concurrent: usize) -> HarnessConfig {
    HarnessConfig {
        placement: PlacementConfig {
            origin: BlockPos::new(0, 64, 0),
            width: 1024,
            depth: 1024,
            seed: 7,
        },
        max_concurrent,
        ..HarnessConfig::default()
    }
}

/// Generate `n` deterministic placement requests with footprints between
/// 3 and 12 blocks per horizontal axis.
///
/// Every fourth request is rotatable.
pub fn footprint_requests(n: usize, seed: u64) -> Vec<PlacementRequest> {
    (0..n as u64)
        .map(|i| {
            let h = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(i.wrapping_mul(1442695040888963407));
            let x = 3 + (h % 10) as u32;
            let z = 3 + ((h >> 16) % 10) as u32;
            let y = 2 + ((h >> 32) % 4) as u32;
            PlacementRequest {
                extent: Extent::new(x, y, z),
                padding: 1 + ((h >> 40) % 3) as u32,
                rotation: if i % 4 == 0 {
                    RotationPolicy::Random
                } else {
                    RotationPolicy::Fixed(Rotation::None)
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{TickId, WorldEvent};
    use gantry_engine::{SuiteRunner, TestFilter};
    use gantry_test_utils::GridWorld;

    #[test]
    fn bench_config_validates() {
        bench_config(64).validate().unwrap();
    }

    #[test]
    fn polling_profile_finishes_together() {
        let catalog = polling_profile(16, 5).unwrap();
        assert_eq!(catalog.len(), 16);
        let mut world = GridWorld::new();
        let report = SuiteRunner::new(bench_config(16))
            .unwrap()
            .run(&catalog, &TestFilter::all(), &mut world)
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.ticks, 6);
    }

    #[test]
    fn event_profile_counts_unpositioned_events() {
        let catalog = event_profile(4, "pulse", 3).unwrap();
        let mut world = GridWorld::new();
        for t in 2..=4 {
            world.schedule_event(TickId(t), WorldEvent::new("pulse"));
        }
        let report = SuiteRunner::new(bench_config(4))
            .unwrap()
            .run(&catalog, &TestFilter::all(), &mut world)
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.ticks, 4);
    }

    #[test]
    fn footprint_requests_deterministic_and_bounded() {
        let a = footprint_requests(100, 42);
        let b = footprint_requests(100, 42);
        assert_eq!(a, b);
        for request in &a {
            assert!((3..=12).contains(&request.extent.x));
            assert!((3..=12).contains(&request.extent.z));
            assert!((1..=3).contains(&request.padding));
        }
    }
}
