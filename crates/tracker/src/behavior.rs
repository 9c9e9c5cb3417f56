//! Per-block-type reactions, invoked by the tracker while it notifies
//! neighbours and replays captured changes.

use std::collections::HashMap;
use std::rc::Rc;

use phasetrack_common::{BlockPos, BlockSnapshot, BlockState, BlockType, Direction, Entity, UpdateFlags};
use phasetrack_kernel::{BlockView, WorldHost};

use crate::cause::Cause;
use crate::error::TrackerError;
use crate::tracker::CauseTracker;

/// Behaviour of one block type. All hooks default to doing nothing.
///
/// Hooks receive the tracker rather than the world so that every mutation
/// they make is attributed to the active phase.
pub trait BlockBehavior<W: WorldHost> {
    /// A neighbour of `pos` changed; `neighbor` is the block type that was
    /// there before the change.
    fn on_neighbor_changed(
        &self,
        _tracker: &mut CauseTracker<W>,
        _pos: BlockPos,
        _state: BlockState,
        _neighbor: BlockType,
    ) -> Result<(), TrackerError> {
        Ok(())
    }

    fn on_block_added(
        &self,
        _tracker: &mut CauseTracker<W>,
        _pos: BlockPos,
        _state: BlockState,
    ) -> Result<(), TrackerError> {
        Ok(())
    }

    /// The state adjusted for its surroundings, as read through `view`.
    fn actual_state(&self, state: BlockState, _view: &dyn BlockView, _pos: BlockPos) -> BlockState {
        state
    }
}

/// Behaviours keyed by block type.
pub struct BehaviorRegistry<W: WorldHost> {
    behaviors: HashMap<BlockType, Rc<dyn BlockBehavior<W>>>,
}

impl<W: WorldHost> Default for BehaviorRegistry<W> {
    fn default() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }
}

impl<W: WorldHost> BehaviorRegistry<W> {
    pub fn register(&mut self, block: BlockType, behavior: Rc<dyn BlockBehavior<W>>) {
        self.behaviors.insert(block, behavior);
    }

    pub fn get(&self, block: BlockType) -> Option<Rc<dyn BlockBehavior<W>>> {
        self.behaviors.get(&block).cloned()
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

impl<W: WorldHost> std::fmt::Debug for BehaviorRegistry<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut blocks: Vec<_> = self.behaviors.keys().copied().collect();
        blocks.sort();
        f.debug_struct("BehaviorRegistry").field("blocks", &blocks).finish()
    }
}

/// Connects to adjacent blocks of the same type: the actual state's meta is
/// a bitmask over west, east, north, south.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectingBlock;

impl<W: WorldHost> BlockBehavior<W> for ConnectingBlock {
    fn actual_state(&self, state: BlockState, view: &dyn BlockView, pos: BlockPos) -> BlockState {
        let sides = [Direction::West, Direction::East, Direction::North, Direction::South];
        let mask = sides
            .iter()
            .enumerate()
            .filter(|(_, side)| {
                view.block_state(pos.offset(**side))
                    .is_some_and(|neighbor| neighbor.block == state.block)
            })
            .fold(0u8, |mask, (bit, _)| mask | (1 << bit));
        BlockState::with_meta(state.block, mask)
    }
}

/// Needs a non-air block underneath; otherwise breaks and drops itself as
/// an item.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportedBlock;

impl<W: WorldHost> BlockBehavior<W> for SupportedBlock {
    fn on_neighbor_changed(
        &self,
        tracker: &mut CauseTracker<W>,
        pos: BlockPos,
        state: BlockState,
        _neighbor: BlockType,
    ) -> Result<(), TrackerError> {
        let below = tracker.get_block_state(pos.offset(Direction::Down));
        if below.is_some_and(|below| !below.block.is_air()) {
            return Ok(());
        }
        let snapshot = BlockSnapshot::new(pos, state, UpdateFlags::DEFAULT);
        let cause = tracker
            .current_cause()
            .unwrap_or_else(|| Cause::source(snapshot));
        tracker.set_block_state(pos, BlockState::AIR, UpdateFlags::DEFAULT)?;
        let drop = Entity::item(state.block.name(), 1, pos.center());
        tracker.process_spawn_entity(drop, &cause)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasetrack_common::ChunkPos;
    use phasetrack_kernel::World;

    #[test]
    fn connecting_block_counts_same_type_neighbours() {
        let mut world = World::new("connect");
        world.load_chunk(ChunkPos::new(0, 0), true);
        let wire = BlockState::of(BlockType::REDSTONE_WIRE);
        let pos = BlockPos::new(4, 64, 4);
        world.set_block_state_raw(pos.offset(Direction::West), wire);
        world.set_block_state_raw(pos.offset(Direction::South), wire);
        world.set_block_state_raw(pos.offset(Direction::East), BlockState::of(BlockType::STONE));

        let state = BlockBehavior::<World>::actual_state(&ConnectingBlock, wire, &world, pos);
        assert_eq!(state.meta, 0b1001);
    }

    #[test]
    fn registry_lookup() {
        let mut registry = BehaviorRegistry::<World>::default();
        assert!(registry.is_empty());
        registry.register(BlockType::TORCH, Rc::new(SupportedBlock));
        assert!(registry.get(BlockType::TORCH).is_some());
        assert!(registry.get(BlockType::STONE).is_none());
        assert_eq!(registry.len(), 1);
    }
}
