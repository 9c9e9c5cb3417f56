use std::collections::{HashMap, VecDeque};

use phasetrack_common::{BlockPos, BlockState};
use phasetrack_kernel::BlockView;

use crate::transaction::BlockTransaction;

/// Read-through view over a batch of transactions being replayed.
///
/// Positions touched by already-processed transactions answer with those
/// transactions' final states; everything else falls through to the world.
#[derive(Debug, Clone, Default)]
pub struct ProxyBlockAccess {
    pending: VecDeque<(BlockPos, BlockState)>,
    processed: HashMap<BlockPos, BlockState>,
}

impl ProxyBlockAccess {
    /// Invalid transactions are never replayed, so they are not queued.
    pub fn new(transactions: &[BlockTransaction]) -> Self {
        let pending = transactions
            .iter()
            .filter(|tx| tx.is_valid())
            .map(|tx| (tx.pos(), tx.final_snapshot().state))
            .collect();
        Self {
            pending,
            processed: HashMap::new(),
        }
    }

    /// Mark the next queued transaction as processed.
    pub fn proceed(&mut self) {
        if let Some((pos, state)) = self.pending.pop_front() {
            self.processed.insert(pos, state);
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn block_state(&self, world: &impl BlockView, pos: BlockPos) -> Option<BlockState> {
        match self.processed.get(&pos) {
            Some(state) => Some(*state),
            None => world.block_state(pos),
        }
    }

    pub fn view<'a, W: BlockView>(&'a self, world: &'a W) -> ProxyView<'a, W> {
        ProxyView { proxy: self, world }
    }
}

/// A [`BlockView`] combining a proxy with the world behind it.
pub struct ProxyView<'a, W> {
    proxy: &'a ProxyBlockAccess,
    world: &'a W,
}

impl<W: BlockView> BlockView for ProxyView<'_, W> {
    fn block_state(&self, pos: BlockPos) -> Option<BlockState> {
        self.proxy.block_state(self.world, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureType;
    use phasetrack_common::{BlockSnapshot, BlockType, ChunkPos, UpdateFlags};
    use phasetrack_kernel::World;

    fn place(pos: BlockPos, block: BlockType) -> BlockTransaction {
        BlockTransaction::new(
            BlockSnapshot::new(pos, BlockState::AIR, UpdateFlags::DEFAULT),
            BlockSnapshot::new(pos, BlockState::of(block), UpdateFlags::DEFAULT),
            CaptureType::Place,
        )
    }

    #[test]
    fn processed_transactions_shadow_the_world() {
        let mut world = World::new("proxy");
        world.load_chunk(ChunkPos::new(0, 0), true);
        let a = BlockPos::new(0, 64, 0);
        let b = BlockPos::new(1, 64, 0);
        let mut proxy = ProxyBlockAccess::new(&[place(a, BlockType::STONE), place(b, BlockType::DIRT)]);

        assert_eq!(proxy.block_state(&world, a), Some(BlockState::AIR));
        proxy.proceed();
        assert_eq!(proxy.block_state(&world, a), Some(BlockState::of(BlockType::STONE)));
        assert_eq!(proxy.block_state(&world, b), Some(BlockState::AIR));
        proxy.proceed();
        assert_eq!(proxy.view(&world).block_state(b), Some(BlockState::of(BlockType::DIRT)));
        assert_eq!(proxy.remaining(), 0);
    }

    #[test]
    fn invalid_transactions_are_skipped() {
        let pos = BlockPos::new(0, 64, 0);
        let mut invalid = place(pos, BlockType::STONE);
        invalid.set_valid(false);
        let proxy = ProxyBlockAccess::new(&[invalid]);
        assert_eq!(proxy.remaining(), 0);
    }
}
