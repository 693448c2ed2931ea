//! Spatial isolation for concurrently running test instances.
//!
//! Every running instance owns a padded region of the shared world and a
//! coordinate frame that maps the scenario's relative coordinates into it.
//!
//! - [`InstanceFrame`]: relative ↔ absolute transform with per-instance
//!   rotation.
//! - [`PlacementManager`]: first-fit allocation of non-overlapping padded
//!   regions inside a fixed grid.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod frame;
pub mod placement;

pub use error::PlacementError;
pub use frame::InstanceFrame;
pub use placement::{
    Placement, PlacementConfig, PlacementManager, PlacementRequest, RotationPolicy,
};
