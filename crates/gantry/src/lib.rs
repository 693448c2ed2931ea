//! Gantry: a tick-synchronized in-world test harness for voxel simulations.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Gantry sub-crates. For most users, adding `gantry` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use gantry::prelude::*;
//! # use gantry_test_utils::GridWorld;
//!
//! let mut registry = TestRegistry::new();
//! registry
//!     .register("redstone", "lamp_lights", |ctx| {
//!         let lamp = BlockPos::new(1, 1, 1);
//!         ctx.start_sequence()
//!             .then_idle(3)
//!             .then_execute(move |ctx| {
//!                 ctx.set_block(lamp, Some(&BlockKind::from("minecraft:redstone_lamp")));
//!                 Ok(())
//!             })
//!             .then_wait(move |ctx| {
//!                 ctx.assert_block_present(&"minecraft:redstone_lamp".into(), lamp, true)
//!             })
//!             .then_succeed();
//!         Ok(())
//!     })
//!     .unwrap()
//!     .max_ticks(20);
//! let catalog = registry.freeze().unwrap();
//!
//! // Any `Simulation` implementation works here.
//! let mut world = GridWorld::new();
//! let report = SuiteRunner::new(HarnessConfig::default())
//!     .unwrap()
//!     .run(&catalog, &TestFilter::all(), &mut world)
//!     .unwrap();
//! assert!(report.is_success());
//! assert_eq!(report.ticks, 4);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `gantry-core` | IDs, geometry, `AssertionFailure`, the `Simulation` trait |
//! | [`space`] | `gantry-space` | Instance frames and padded region placement |
//! | [`engine`] | `gantry-engine` | Registry, scheduler, sequences, retries, reporting |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`gantry-core`).
///
/// Contains block-grid geometry, the [`types::AssertionFailure`] error and
/// the [`types::Simulation`] trait a host world implements.
pub use gantry_core as types;

/// Instance frames and region placement (`gantry-space`).
///
/// [`space::InstanceFrame`] maps relative coordinates into an instance's
/// region; [`space::PlacementManager`] keeps concurrent regions apart.
pub use gantry_space as space;

/// Test orchestration (`gantry-engine`).
///
/// [`engine::TestRegistry`] collects tests, [`engine::SuiteRunner`] runs
/// them, and [`engine::OutcomeReporter`] summarizes the results.
pub use gantry_engine as engine;

/// Common imports for writing and running tests.
///
/// ```rust
/// use gantry::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use gantry_core::{
        AssertionFailure, BlockBox, BlockKind, BlockPos, Direction, EntityKind, Extent, Rotation,
        Simulation, StructureId, TestKey, TickId, WorldEvent,
    };

    // Writing tests
    pub use gantry_engine::{
        Continuation, SequenceStep, Stages, SubscriptionHandle, Suspend, TestContext,
        TestRegistry,
    };

    // Running tests
    pub use gantry_engine::{
        HarnessConfig, OutcomeStatus, RunError, RunEvent, RunReport, SuiteRunner, TestFilter,
    };
}
