//! Per-instance coordinate frame.
//!
//! Scenarios address blocks relative to their structure's minimum corner
//! as authored (rotation 0°). When the harness runs an instance rotated,
//! the frame rotates every relative position about the vertical axis and
//! translates it back so the rotated footprint still starts at `origin`.
//! The same rotation applies to directions, so a scenario that pushes a
//! piston "south" pushes it along the instance's effective facing.

use gantry_core::{BlockBox, BlockPos, Direction, Extent, Rotation};

/// Relative ↔ absolute transform for one test instance.
///
/// `Copy` on purpose: contexts and step lists hold their own frame value
/// and never need to reach back into the owning instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceFrame {
    origin: BlockPos,
    rotation: Rotation,
    extent: Extent,
}

impl InstanceFrame {
    /// A frame whose rotated footprint starts at `origin`.
    ///
    /// `extent` is the structure size as authored, before rotation.
    pub fn new(origin: BlockPos, rotation: Rotation, extent: Extent) -> Self {
        Self {
            origin,
            rotation,
            extent,
        }
    }

    /// Absolute position of the footprint's minimum corner.
    pub fn origin(&self) -> BlockPos {
        self.origin
    }

    /// Rotation applied to this instance.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Structure size as authored.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Absolute box covered by the rotated structure, or `None` for an
    /// empty footprint.
    pub fn bounds(&self) -> Option<BlockBox> {
        BlockBox::from_extent(self.origin, self.extent.rotated(self.rotation))
    }

    /// `true` if an absolute position lies within the instance's structure.
    pub fn contains(&self, absolute: BlockPos) -> bool {
        self.bounds().is_some_and(|b| b.contains(absolute))
    }

    /// Map a relative position to an absolute world position.
    pub fn world_location(&self, relative: BlockPos) -> BlockPos {
        self.origin + self.rotation.rotate_offset(relative) + self.pivot()
    }

    /// Map an absolute world position back to the relative frame.
    pub fn relative_location(&self, absolute: BlockPos) -> BlockPos {
        self.rotation
            .inverse()
            .rotate_offset(absolute - self.origin - self.pivot())
    }

    /// Rotate a direction from the relative frame into the world.
    pub fn rotate_direction(&self, direction: Direction) -> Direction {
        self.rotation.rotate_direction(direction)
    }

    /// Rotate a world direction back into the relative frame.
    pub fn unrotate_direction(&self, direction: Direction) -> Direction {
        self.rotation.inverse().rotate_direction(direction)
    }

    /// The world direction the authored south axis points along.
    pub fn facing(&self) -> Direction {
        self.rotate_direction(Direction::South)
    }

    // Offset that moves the rotated footprint back onto non-negative
    // local coordinates.
    fn pivot(&self) -> BlockPos {
        let far_x = self.extent.x as i32 - 1;
        let far_z = self.extent.z as i32 - 1;
        match self.rotation {
            Rotation::None => BlockPos::ZERO,
            Rotation::Clockwise90 => BlockPos::new(far_z, 0, 0),
            Rotation::Clockwise180 => BlockPos::new(far_x, 0, far_z),
            Rotation::CounterClockwise90 => BlockPos::new(0, 0, far_x),
        }
    }
}
