//! The host-world collaborator the harness drives and observes.
//!
//! Gantry never simulates anything itself. Physics, redstone and entity
//! behaviour live behind [`Simulation`]; the harness only asks the world to
//! load structures, advance one tick, and answer block/entity queries at
//! absolute positions. All relative-to-absolute translation happens in the
//! harness before the world is consulted.

use std::fmt;

use crate::geom::{BlockBox, BlockPos, Extent, Rotation};
use crate::id::{BatchId, StructureId, TickId};

/// Namespaced block identifier, e.g. `minecraft:sticky_piston`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKind(pub String);

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKind {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

/// Namespaced entity type identifier, e.g. `minecraft:armor_stand`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKind(pub String);

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKind {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

/// Something the world reports as having happened during a tick.
///
/// Delivered through the harness's scoped event bus to instances that
/// subscribed to `topic`. Events carrying a `position` only reach the
/// instance whose region contains it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldEvent {
    /// Event channel, e.g. `"piston_activate"` or `"block_break"`.
    pub topic: String,
    /// Absolute position the event is about, if any.
    pub position: Option<BlockPos>,
    /// Free-form payload for handlers that need more than the topic.
    pub detail: String,
}

impl WorldEvent {
    /// An event on `topic` with no position and an empty payload.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            position: None,
            detail: String::new(),
        }
    }

    /// Attach an absolute position.
    pub fn at(mut self, position: BlockPos) -> Self {
        self.position = Some(position);
        self
    }

    /// Attach a payload.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// The simulation the harness runs scenarios against.
///
/// Implementations own all world state. The harness is single-threaded
/// and calls these methods only from its tick loop, so no method needs
/// to be reentrant.
pub trait Simulation {
    /// Size of a structure template, or `None` if the id is unknown.
    fn structure_extent(&self, structure: &StructureId) -> Option<Extent>;

    /// Load `structure` (or an empty platform when `None`) into `region`,
    /// rotated by `rotation`. `region` is already sized for the rotated
    /// footprint.
    fn place_structure(
        &mut self,
        structure: Option<&StructureId>,
        region: &BlockBox,
        rotation: Rotation,
    ) -> Result<(), String>;

    /// Reset every block and entity inside `region`.
    fn clear_region(&mut self, region: &BlockBox);

    /// Advance the world by one tick, appending anything observable to
    /// `events`.
    fn tick(&mut self, tick: TickId, events: &mut Vec<WorldEvent>);

    /// Block at an absolute position. `None` means air.
    fn block(&self, pos: BlockPos) -> Option<BlockKind>;

    /// Replace the block at an absolute position. `None` places air.
    fn set_block(&mut self, pos: BlockPos, block: Option<&BlockKind>);

    /// Entities currently occupying an absolute block position.
    fn entities_at(&self, pos: BlockPos) -> Vec<EntityKind>;

    /// Spawn an entity at an absolute position.
    fn spawn_entity(&mut self, kind: &EntityKind, pos: BlockPos);

    /// Called once before the first instance of `batch` is placed.
    fn begin_batch(&mut self, _batch: &BatchId) {}

    /// Called once after the last instance of `batch` has finished.
    fn end_batch(&mut self, _batch: &BatchId) {}
}
