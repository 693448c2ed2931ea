//! Test utilities for Gantry development.
//!
//! Provides [`GridWorld`], an in-memory [`Simulation`] with scripted
//! block changes and events, plus small shared-state fixtures for
//! observing scenario callbacks from test code.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::{HashMap, HashSet};

use gantry_core::{
    BatchId, BlockBox, BlockKind, BlockPos, EntityKind, Extent, Rotation, Simulation, StructureId,
    TickId, WorldEvent,
};

/// In-memory world backed by a block map.
///
/// Nothing moves on its own: the only changes between ticks are the ones
/// scheduled with [`schedule_block`](GridWorld::schedule_block) and the
/// events scheduled with [`schedule_event`](GridWorld::schedule_event).
/// Every structure placement, region clear and batch boundary is logged
/// for inspection.
#[derive(Debug, Default)]
pub struct GridWorld {
    blocks: HashMap<BlockPos, BlockKind>,
    entities: Vec<(BlockPos, EntityKind)>,
    structures: HashMap<StructureId, Extent>,
    rejected: HashSet<StructureId>,
    scripted_blocks: Vec<(TickId, BlockPos, Option<BlockKind>)>,
    scripted_events: Vec<(TickId, WorldEvent)>,
    placement_log: Vec<(Option<StructureId>, BlockBox, Rotation)>,
    cleared: Vec<BlockBox>,
    batch_log: Vec<String>,
    last_tick: TickId,
}

impl GridWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a structure template of the given size.
    pub fn with_structure(mut self, id: impl Into<StructureId>, extent: Extent) -> Self {
        self.structures.insert(id.into(), extent);
        self
    }

    /// Make `place_structure` fail for a template.
    pub fn rejecting(mut self, id: impl Into<StructureId>) -> Self {
        self.rejected.insert(id.into());
        self
    }

    /// Set (or clear, with `None`) an absolute block when global tick
    /// `tick` runs.
    pub fn schedule_block(&mut self, tick: TickId, pos: BlockPos, block: Option<BlockKind>) {
        self.scripted_blocks.push((tick, pos, block));
    }

    /// Publish `event` when global tick `tick` runs.
    pub fn schedule_event(&mut self, tick: TickId, event: WorldEvent) {
        self.scripted_events.push((tick, event));
    }

    /// Block at an absolute position.
    pub fn block_at(&self, pos: BlockPos) -> Option<BlockKind> {
        self.blocks.get(&pos).cloned()
    }

    /// Number of non-air blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Most recent global tick executed.
    pub fn last_tick(&self) -> TickId {
        self.last_tick
    }

    /// Every successful placement, in call order.
    pub fn placement_log(&self) -> &[(Option<StructureId>, BlockBox, Rotation)] {
        &self.placement_log
    }

    /// Every cleared region, in call order.
    pub fn cleared_regions(&self) -> &[BlockBox] {
        &self.cleared
    }

    /// `"begin <batch>"` / `"end <batch>"` entries, in call order.
    pub fn batch_log(&self) -> &[String] {
        &self.batch_log
    }
}

impl Simulation for GridWorld {
    fn structure_extent(&self, structure: &StructureId) -> Option<Extent> {
        self.structures.get(structure).copied()
    }

    fn place_structure(
        &mut self,
        structure: Option<&StructureId>,
        region: &BlockBox,
        rotation: Rotation,
    ) -> Result<(), String> {
        if let Some(id) = structure {
            if self.rejected.contains(id) {
                return Err(format!("template {id} is corrupt"));
            }
        }
        self.placement_log
            .push((structure.cloned(), *region, rotation));
        Ok(())
    }

    fn clear_region(&mut self, region: &BlockBox) {
        self.blocks.retain(|pos, _| !region.contains(*pos));
        self.entities.retain(|(pos, _)| !region.contains(*pos));
        self.cleared.push(*region);
    }

    fn tick(&mut self, tick: TickId, events: &mut Vec<WorldEvent>) {
        self.last_tick = tick;
        for (at, pos, block) in &self.scripted_blocks {
            if *at == tick {
                match block {
                    Some(kind) => self.blocks.insert(*pos, kind.clone()),
                    None => self.blocks.remove(pos),
                };
            }
        }
        events.extend(
            self.scripted_events
                .iter()
                .filter(|(at, _)| *at == tick)
                .map(|(_, event)| event.clone()),
        );
    }

    fn block(&self, pos: BlockPos) -> Option<BlockKind> {
        self.block_at(pos)
    }

    fn set_block(&mut self, pos: BlockPos, block: Option<&BlockKind>) {
        match block {
            Some(kind) => {
                self.blocks.insert(pos, kind.clone());
            }
            None => {
                self.blocks.remove(&pos);
            }
        }
    }

    fn entities_at(&self, pos: BlockPos) -> Vec<EntityKind> {
        self.entities
            .iter()
            .filter(|(at, _)| *at == pos)
            .map(|(_, kind)| kind.clone())
            .collect()
    }

    fn spawn_entity(&mut self, kind: &EntityKind, pos: BlockPos) {
        self.entities.push((pos, kind.clone()));
    }

    fn begin_batch(&mut self, batch: &BatchId) {
        self.batch_log.push(format!("begin {batch}"));
    }

    fn end_batch(&mut self, batch: &BatchId) {
        self.batch_log.push(format!("end {batch}"));
    }
}
