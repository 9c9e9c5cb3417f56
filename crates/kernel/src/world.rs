use phasetrack_common::{
    ActorId, BlockPos, BlockState, BlockType, ChunkPos, Entity, EntityId, TrackerKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::chunk::Chunk;
use crate::host::{BlockView, WorldHost};
use crate::WorldEvent;

/// In-memory world: chunked block storage, entities, actors and attribution.
///
/// It performs no causal bookkeeping of its own. The cause tracker decides
/// when to call into it; the world only applies the write and logs it.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    name: String,
    remote: bool,
    tracker_attached: bool,
    chunks: BTreeMap<ChunkPos, Chunk>,
    entities: BTreeMap<EntityId, Entity>,
    /// Load order of entities, as the simulation would tick them.
    loaded_entities: Vec<EntityId>,
    actors: Vec<ActorId>,
    sleeping: BTreeSet<ActorId>,
    all_sleeping: bool,
    /// Append-only event log of all raw mutations.
    #[serde(skip)]
    event_log: Vec<WorldEvent>,
}

impl World {
    /// Create an empty server-side world with no chunks loaded.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a client-side world.
    pub fn remote(name: impl Into<String>) -> Self {
        Self {
            remote: true,
            ..Self::new(name)
        }
    }

    /// Load (or reload) a chunk. Reloading keeps existing contents.
    pub fn load_chunk(&mut self, pos: ChunkPos, populated: bool) {
        self.chunks
            .entry(pos)
            .or_insert_with(|| Chunk::new(pos, populated))
            .populated = populated;
        self.event_log
            .push(WorldEvent::ChunkLoaded { chunk: pos, populated });
    }

    /// Load every chunk in the inclusive square `[-radius, radius]` around the origin.
    pub fn load_area(&mut self, radius: i32) {
        for x in -radius..=radius {
            for z in -radius..=radius {
                self.load_chunk(ChunkPos::new(x, z), true);
            }
        }
    }

    pub fn unload_chunk(&mut self, pos: ChunkPos) -> Option<Chunk> {
        let chunk = self.chunks.remove(&pos);
        if chunk.is_some() {
            self.event_log.push(WorldEvent::ChunkUnloaded { chunk: pos });
        }
        chunk
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of non-air blocks across loaded chunks.
    pub fn block_count(&self) -> usize {
        self.chunks.values().map(Chunk::block_count).sum()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, Entity> {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Entity ids in the order they were added.
    pub fn loaded_entities(&self) -> &[EntityId] {
        &self.loaded_entities
    }

    pub fn actors(&self) -> &[ActorId] {
        &self.actors
    }

    pub fn set_sleeping(&mut self, actor: ActorId, sleeping: bool) {
        if sleeping {
            self.sleeping.insert(actor);
        } else {
            self.sleeping.remove(&actor);
        }
        self.update_sleeping_flag();
    }

    pub fn all_sleeping(&self) -> bool {
        self.all_sleeping
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    pub fn creator(&self, pos: BlockPos) -> Option<ActorId> {
        self.tracked_actor(pos, TrackerKind::Creator)
    }

    pub fn notifier(&self, pos: BlockPos) -> Option<ActorId> {
        self.tracked_actor(pos, TrackerKind::Notifier)
    }

    /// Set or clear the creator of a position. No-op for unloaded chunks.
    pub fn set_creator(&mut self, pos: BlockPos, actor: Option<ActorId>) {
        if let Some(chunk) = self.chunks.get_mut(&pos.chunk()) {
            chunk.set_tracked(pos, TrackerKind::Creator, actor);
        }
    }

    /// Set or clear the notifier of a position. No-op for unloaded chunks.
    pub fn set_notifier(&mut self, pos: BlockPos, actor: Option<ActorId>) {
        if let Some(chunk) = self.chunks.get_mut(&pos.chunk()) {
            chunk.set_tracked(pos, TrackerKind::Notifier, actor);
        }
    }

    /// All block changes in the log, in application order.
    pub fn block_changes(&self) -> Vec<(BlockPos, BlockState)> {
        self.event_log
            .iter()
            .filter_map(|e| match e {
                WorldEvent::BlockChanged { pos, new, .. } => Some((*pos, *new)),
                _ => None,
            })
            .collect()
    }
}

impl BlockView for World {
    fn block_state(&self, pos: BlockPos) -> Option<BlockState> {
        self.chunks.get(&pos.chunk()).map(|c| c.block_state(pos))
    }
}

impl WorldHost for World {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_remote(&self) -> bool {
        self.remote
    }

    fn tracker_attached(&self) -> bool {
        self.tracker_attached
    }

    fn set_tracker_attached(&mut self, attached: bool) {
        self.tracker_attached = attached;
    }

    fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool {
        self.chunks.contains_key(&chunk)
    }

    fn is_chunk_populated(&self, chunk: ChunkPos) -> bool {
        self.chunks.get(&chunk).is_some_and(|c| c.populated)
    }

    fn set_block_state_raw(&mut self, pos: BlockPos, state: BlockState) -> Option<BlockState> {
        let chunk = self.chunks.get_mut(&pos.chunk())?;
        let old = chunk.set_block_state(pos, state)?;
        self.event_log.push(WorldEvent::BlockChanged {
            pos,
            old,
            new: state,
        });
        Some(old)
    }

    fn check_light(&mut self, pos: BlockPos) {
        self.event_log.push(WorldEvent::LightChecked { pos });
    }

    fn mark_block_for_update(&mut self, pos: BlockPos) {
        self.event_log.push(WorldEvent::BlockMarkedForUpdate { pos });
    }

    fn update_comparator_output_level(&mut self, pos: BlockPos, block: BlockType) {
        self.event_log
            .push(WorldEvent::ComparatorUpdated { pos, block });
    }

    fn add_entity(&mut self, entity: Entity) {
        let chunk = entity.chunk();
        let id = entity.id;
        // Forced spawns may target unloaded chunks; they still join the loaded list.
        if let Some(c) = self.chunks.get_mut(&chunk) {
            c.add_entity(id);
        }
        self.loaded_entities.push(id);
        self.entities.insert(id, entity);
        self.event_log.push(WorldEvent::EntityAdded { id, chunk });
        tracing::trace!(world = %self.name, entity = ?id, %chunk, "entity added");
    }

    fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        let chunk = entity.chunk();
        if let Some(c) = self.chunks.get_mut(&chunk) {
            c.remove_entity(id);
        }
        self.loaded_entities.retain(|loaded| *loaded != id);
        self.event_log.push(WorldEvent::EntityRemoved { id, chunk });
        tracing::trace!(world = %self.name, entity = ?id, %chunk, "entity removed");
        Some(entity)
    }

    fn add_actor(&mut self, actor: ActorId, entity: EntityId) {
        if !self.actors.contains(&actor) {
            self.actors.push(actor);
        }
        self.event_log
            .push(WorldEvent::ActorJoined { actor, entity });
    }

    fn update_sleeping_flag(&mut self) {
        self.all_sleeping =
            !self.actors.is_empty() && self.actors.iter().all(|a| self.sleeping.contains(a));
        self.event_log.push(WorldEvent::SleepingFlagUpdated {
            all_sleeping: self.all_sleeping,
        });
    }

    fn tracked_actor(&self, pos: BlockPos, kind: TrackerKind) -> Option<ActorId> {
        self.chunks.get(&pos.chunk())?.tracked(pos, kind)
    }

    fn add_tracked_block_position(
        &mut self,
        block: BlockType,
        pos: BlockPos,
        actor: ActorId,
        kind: TrackerKind,
    ) {
        // Air carries no attribution worth keeping.
        if block.is_air() {
            return;
        }
        let Some(chunk) = self.chunks.get_mut(&pos.chunk()) else {
            return;
        };
        chunk.set_tracked(pos, kind, Some(actor));
        self.event_log
            .push(WorldEvent::AttributionTracked { pos, actor, kind });
    }
}
