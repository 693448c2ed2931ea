//! Error types for region placement.

use std::error::Error;
use std::fmt;

use gantry_core::Extent;

/// Errors arising from [`PlacementManager::place`](crate::PlacementManager::place).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlacementError {
    /// No free slot is currently large enough for the padded footprint.
    NoSpace {
        /// Rotated structure footprint that was requested.
        footprint: Extent,
        /// Padding requested around the footprint.
        padding: u32,
        /// Number of regions held by other instances at the time.
        occupied: usize,
    },
    /// The padded footprint is larger than the whole grid and can never
    /// be placed.
    FootprintTooLarge {
        /// Rotated structure footprint that was requested.
        footprint: Extent,
        /// Padding requested around the footprint.
        padding: u32,
        /// Grid size along x.
        grid_width: u32,
        /// Grid size along z.
        grid_depth: u32,
    },
    /// The structure footprint has a zero-length axis.
    EmptyFootprint,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpace {
                footprint,
                padding,
                occupied,
            } => write!(
                f,
                "no space for footprint {footprint} with padding {padding} \
                 ({occupied} regions occupied)"
            ),
            Self::FootprintTooLarge {
                footprint,
                padding,
                grid_width,
                grid_depth,
            } => write!(
                f,
                "footprint {footprint} with padding {padding} exceeds \
                 {grid_width}x{grid_depth} grid"
            ),
            Self::EmptyFootprint => write!(f, "structure footprint is empty"),
        }
    }
}

impl Error for PlacementError {}
