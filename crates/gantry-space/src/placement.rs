//! Padded region allocation for concurrently running instances.
//!
//! The world is a single shared resource and padding is the only
//! isolation between instances, so the manager guarantees that no two
//! reserved regions (footprint plus padding on every horizontal side)
//! ever share a block column. Allocation is bottom-left first fit: the
//! candidate corners are the grid origin and the corners adjacent to
//! already reserved regions, tried in `(z, x)` order.

use gantry_core::{BlockBox, BlockPos, Extent, InstanceId, Rotation};
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::PlacementError;
use crate::frame::InstanceFrame;

// ── PlacementConfig ───────────────────────────────────────────────

/// Grid the manager allocates regions in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementConfig {
    /// Minimum corner of the grid. All structures sit on `origin.y`.
    pub origin: BlockPos,
    /// Grid size along x. Default: 256.
    pub width: u32,
    /// Grid size along z. Default: 256.
    pub depth: u32,
    /// Seed for rotation selection of rotatable tests. Default: 0.
    pub seed: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            origin: BlockPos::new(0, 64, 0),
            width: 256,
            depth: 256,
            seed: 0,
        }
    }
}

// ── PlacementRequest ──────────────────────────────────────────────

/// How the rotation of a new instance is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Always use this rotation.
    Fixed(Rotation),
    /// Draw one of the four rotations from the manager's seeded RNG.
    Random,
}

/// What an instance needs from the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementRequest {
    /// Structure size as authored.
    pub extent: Extent,
    /// Isolation margin on every horizontal side.
    pub padding: u32,
    /// Rotation selection.
    pub rotation: RotationPolicy,
}

// ── Placement ─────────────────────────────────────────────────────

/// A granted region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Instance holding the region.
    pub instance: InstanceId,
    /// Coordinate frame for the instance's structure.
    pub frame: InstanceFrame,
    /// Rotated structure bounds.
    pub structure: BlockBox,
    /// Structure bounds inflated by padding; the reserved area.
    pub reserved: BlockBox,
}

// ── PlacementManager ──────────────────────────────────────────────

/// Allocates and releases non-overlapping padded regions.
pub struct PlacementManager {
    config: PlacementConfig,
    rng: ChaCha8Rng,
    reserved: IndexMap<InstanceId, BlockBox>,
}

impl PlacementManager {
    /// A manager with an empty grid.
    pub fn new(config: PlacementConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            reserved: IndexMap::new(),
        }
    }

    /// Grid configuration.
    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Number of regions currently reserved.
    pub fn occupied(&self) -> usize {
        self.reserved.len()
    }

    /// Reserved region of `instance`, if it holds one.
    pub fn reserved_region(&self, instance: InstanceId) -> Option<&BlockBox> {
        self.reserved.get(&instance)
    }

    /// All reserved regions in allocation order.
    pub fn reserved_regions(&self) -> impl Iterator<Item = (InstanceId, &BlockBox)> {
        self.reserved.iter().map(|(id, b)| (*id, b))
    }

    /// Reserve a region for `instance`.
    ///
    /// # Errors
    ///
    /// - [`PlacementError::EmptyFootprint`] if the extent has a zero axis.
    /// - [`PlacementError::FootprintTooLarge`] if the padded footprint can
    ///   never fit the grid.
    /// - [`PlacementError::NoSpace`] if it would fit an empty grid but no
    ///   free slot exists right now.
    pub fn place(
        &mut self,
        instance: InstanceId,
        request: &PlacementRequest,
    ) -> Result<Placement, PlacementError> {
        if request.extent.is_empty() {
            return Err(PlacementError::EmptyFootprint);
        }
        let rotation = match request.rotation {
            RotationPolicy::Fixed(r) => r,
            RotationPolicy::Random => Rotation::from_quarter_turns(self.rng.random_range(0..4u8)),
        };
        let footprint = request.extent.rotated(rotation);
        let padding = request.padding;

        let span_x = u64::from(footprint.x) + 2 * u64::from(padding);
        let span_z = u64::from(footprint.z) + 2 * u64::from(padding);
        if span_x > u64::from(self.config.width) || span_z > u64::from(self.config.depth) {
            return Err(PlacementError::FootprintTooLarge {
                footprint,
                padding,
                grid_width: self.config.width,
                grid_depth: self.config.depth,
            });
        }
        // Both spans fit in a u32 grid dimension, hence in i32 offsets below.
        let span_x = span_x as i32;
        let span_z = span_z as i32;

        let corner = self
            .candidate_corners()
            .into_iter()
            .find(|&(x, z)| self.is_free(x, z, span_x, span_z))
            .ok_or(PlacementError::NoSpace {
                footprint,
                padding,
                occupied: self.reserved.len(),
            })?;

        let pad = padding as i32;
        let origin = BlockPos::new(corner.0 + pad, self.config.origin.y, corner.1 + pad);
        let structure =
            BlockBox::from_extent(origin, footprint).ok_or(PlacementError::EmptyFootprint)?;
        let reserved = structure.inflate_horizontal(padding);
        self.reserved.insert(instance, reserved);

        debug!(
            instance = %instance,
            %origin,
            %rotation,
            %footprint,
            padding,
            "region reserved"
        );

        Ok(Placement {
            instance,
            frame: InstanceFrame::new(origin, rotation, request.extent),
            structure,
            reserved,
        })
    }

    /// Release the region held by `instance`, returning it.
    pub fn release(&mut self, instance: InstanceId) -> Option<BlockBox> {
        let released = self.reserved.shift_remove(&instance);
        if let Some(region) = &released {
            debug!(instance = %instance, %region, "region released");
        }
        released
    }

    // Grid origin plus the corners east of and south of every reserved
    // region, sorted north-to-south then west-to-east.
    fn candidate_corners(&self) -> Vec<(i32, i32)> {
        let gx = self.config.origin.x;
        let gz = self.config.origin.z;
        let mut corners = Vec::with_capacity(1 + self.reserved.len() * 3);
        corners.push((gx, gz));
        for region in self.reserved.values() {
            corners.push((region.max.x + 1, region.min.z));
            corners.push((region.min.x, region.max.z + 1));
            corners.push((gx, region.max.z + 1));
        }
        corners.sort_by_key(|&(x, z)| (z, x));
        corners.dedup();
        corners
    }

    fn is_free(&self, x: i32, z: i32, span_x: i32, span_z: i32) -> bool {
        let grid_max_x = i64::from(self.config.origin.x) + i64::from(self.config.width) - 1;
        let grid_max_z = i64::from(self.config.origin.z) + i64::from(self.config.depth) - 1;
        let max_x = i64::from(x) + i64::from(span_x) - 1;
        let max_z = i64::from(z) + i64::from(span_z) - 1;
        if max_x > grid_max_x || max_z > grid_max_z {
            return false;
        }
        // Reserved boxes all share the grid floor, so overlap is decided
        // by the horizontal axes alone.
        let (max_x, max_z) = (max_x as i32, max_z as i32);
        self.reserved.values().all(|r| {
            max_x < r.min.x || r.max.x < x || max_z < r.min.z || r.max.z < z
        })
    }
}

impl std::fmt::Debug for PlacementManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementManager")
            .field("config", &self.config)
            .field("occupied", &self.reserved.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(extent: Extent, padding: u32) -> PlacementRequest {
        PlacementRequest {
            extent,
            padding,
            rotation: RotationPolicy::Fixed(Rotation::None),
        }
    }

    fn small_grid() -> PlacementManager {
        PlacementManager::new(PlacementConfig {
            origin: BlockPos::new(0, 0, 0),
            width: 40,
            depth: 40,
            seed: 7,
        })
    }

    #[test]
    fn first_region_sits_at_padded_grid_origin() {
        let mut m = small_grid();
        let p = m.place(InstanceId(1), &request(Extent::new(4, 4, 4), 2)).unwrap();
        assert_eq!(p.frame.origin(), BlockPos::new(2, 0, 2));
        assert_eq!(p.reserved.min, BlockPos::new(0, 0, 0));
        assert_eq!(p.reserved.max, BlockPos::new(7, 3, 7));
    }

    #[test]
    fn second_region_is_placed_east_of_first() {
        let mut m = small_grid();
        m.place(InstanceId(1), &request(Extent::new(4, 4, 4), 2)).unwrap();
        let p = m.place(InstanceId(2), &request(Extent::new(4, 4, 4), 2)).unwrap();
        assert_eq!(p.reserved.min, BlockPos::new(8, 0, 0));
    }

    #[test]
    fn full_grid_reports_no_space() {
        let mut m = small_grid();
        m.place(InstanceId(1), &request(Extent::new(30, 4, 30), 5)).unwrap();
        let err = m
            .place(InstanceId(2), &request(Extent::new(4, 4, 4), 5))
            .unwrap_err();
        assert_eq!(
            err,
            PlacementError::NoSpace {
                footprint: Extent::new(4, 4, 4),
                padding: 5,
                occupied: 1,
            }
        );
    }

    #[test]
    fn released_space_is_reused() {
        let mut m = small_grid();
        m.place(InstanceId(1), &request(Extent::new(30, 4, 30), 5)).unwrap();
        assert!(m.release(InstanceId(1)).is_some());
        let p = m.place(InstanceId(2), &request(Extent::new(30, 4, 30), 5)).unwrap();
        assert_eq!(p.reserved.min, BlockPos::new(0, 0, 0));
        assert_eq!(m.occupied(), 1);
    }

    #[test]
    fn oversized_footprint_is_rejected_outright() {
        let mut m = small_grid();
        let err = m
            .place(InstanceId(1), &request(Extent::new(38, 4, 4), 2))
            .unwrap_err();
        assert!(matches!(err, PlacementError::FootprintTooLarge { .. }));
    }

    #[test]
    fn empty_footprint_is_rejected() {
        let mut m = small_grid();
        let err = m
            .place(InstanceId(1), &request(Extent::new(0, 4, 4), 2))
            .unwrap_err();
        assert_eq!(err, PlacementError::EmptyFootprint);
    }

    #[test]
    fn random_rotation_is_seed_deterministic() {
        let draw = |seed| {
            let mut m = PlacementManager::new(PlacementConfig {
                seed,
                ..PlacementConfig::default()
            });
            (0..8)
                .map(|i| {
                    let p = m
                        .place(
                            InstanceId(i),
                            &PlacementRequest {
                                extent: Extent::new(3, 3, 5),
                                padding: 1,
                                rotation: RotationPolicy::Random,
                            },
                        )
                        .unwrap();
                    p.frame.rotation()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(11), draw(11));
    }

    #[test]
    fn rotated_footprint_is_reserved() {
        let mut m = small_grid();
        let p = m
            .place(
                InstanceId(1),
                &PlacementRequest {
                    extent: Extent::new(2, 1, 6),
                    padding: 0,
                    rotation: RotationPolicy::Fixed(Rotation::Clockwise90),
                },
            )
            .unwrap();
        assert_eq!(p.structure.extent(), Extent::new(6, 1, 2));
    }
}
