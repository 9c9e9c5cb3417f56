use phasetrack_common::{ActorId, BlockPos, BlockState, ChunkPos, EntityId, TrackerKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One loaded 16x16 column.
///
/// Blocks are stored sparsely: an absent entry is air. Creator and notifier
/// attribution are chunk-scoped so they load and unload with the blocks they
/// describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub pos: ChunkPos,
    pub populated: bool,
    blocks: BTreeMap<BlockPos, BlockState>,
    creators: BTreeMap<BlockPos, ActorId>,
    notifiers: BTreeMap<BlockPos, ActorId>,
    entities: BTreeSet<EntityId>,
}

impl Chunk {
    pub fn new(pos: ChunkPos, populated: bool) -> Self {
        Self {
            pos,
            populated,
            blocks: BTreeMap::new(),
            creators: BTreeMap::new(),
            notifiers: BTreeMap::new(),
            entities: BTreeSet::new(),
        }
    }

    pub fn block_state(&self, pos: BlockPos) -> BlockState {
        self.blocks.get(&pos).copied().unwrap_or(BlockState::AIR)
    }

    /// Store a state. Returns the previous state, or `None` if nothing changed.
    pub fn set_block_state(&mut self, pos: BlockPos, state: BlockState) -> Option<BlockState> {
        let old = self.block_state(pos);
        if old == state {
            return None;
        }
        if state.block.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
        Some(old)
    }

    /// Number of non-air blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn tracked(&self, pos: BlockPos, kind: TrackerKind) -> Option<ActorId> {
        self.attribution(kind).get(&pos).copied()
    }

    /// Set or clear the attribution for one position.
    pub fn set_tracked(&mut self, pos: BlockPos, kind: TrackerKind, actor: Option<ActorId>) {
        let map = match kind {
            TrackerKind::Creator => &mut self.creators,
            TrackerKind::Notifier => &mut self.notifiers,
        };
        match actor {
            Some(actor) => {
                map.insert(pos, actor);
            }
            None => {
                map.remove(&pos);
            }
        }
    }

    pub fn add_entity(&mut self, id: EntityId) {
        self.entities.insert(id);
    }

    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        self.entities.remove(&id)
    }

    pub fn entities(&self) -> &BTreeSet<EntityId> {
        &self.entities
    }

    fn attribution(&self, kind: TrackerKind) -> &BTreeMap<BlockPos, ActorId> {
        match kind {
            TrackerKind::Creator => &self.creators,
            TrackerKind::Notifier => &self.notifiers,
        }
    }
}
