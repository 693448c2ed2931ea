//! Core types and traits for the Gantry test harness.
//!
//! This is the leaf crate of the workspace. It defines the fundamental
//! abstractions every other crate builds on: strongly-typed identifiers,
//! block-grid geometry, the assertion error type, and the [`Simulation`]
//! trait through which the harness drives and observes the host world.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod geom;
pub mod id;
pub mod world;

pub use error::AssertionFailure;
pub use geom::{BlockBox, BlockPos, Direction, Extent, Rotation};
pub use id::{AttemptNumber, BatchId, InstanceId, StructureId, TestKey, TickId};
pub use world::{BlockKind, EntityKind, Simulation, WorldEvent};
