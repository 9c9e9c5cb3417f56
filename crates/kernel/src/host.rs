use phasetrack_common::{ActorId, BlockPos, BlockState, BlockType, ChunkPos, Entity, EntityId, TrackerKind};

/// Read access to block states.
pub trait BlockView {
    /// Current state at `pos`, or `None` when its chunk is not loaded.
    fn block_state(&self, pos: BlockPos) -> Option<BlockState>;
}

/// The raw simulation primitives a cause tracker routes mutations into.
///
/// Implementations store blocks, entities and attribution; they never decide
/// *why* something changes. Every method here is a direct, uncaptured write or
/// read.
pub trait WorldHost: BlockView {
    fn name(&self) -> &str;

    /// Client-side worlds skip neighbour notification and attribution.
    fn is_remote(&self) -> bool {
        false
    }

    /// Whether a cause tracker has already been bound to this world.
    fn tracker_attached(&self) -> bool;

    fn set_tracker_attached(&mut self, attached: bool);

    fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool;

    /// Populated chunks have finished generation and can be rendered.
    fn is_chunk_populated(&self, chunk: ChunkPos) -> bool;

    /// Write a block without any derived updates.
    ///
    /// Returns the previous state, or `None` if the chunk is not loaded or the
    /// state is unchanged.
    fn set_block_state_raw(&mut self, pos: BlockPos, state: BlockState) -> Option<BlockState>;

    fn check_light(&mut self, pos: BlockPos);

    fn mark_block_for_update(&mut self, pos: BlockPos);

    fn update_comparator_output_level(&mut self, pos: BlockPos, block: BlockType);

    /// Insert an entity into its chunk and the loaded-entity list.
    fn add_entity(&mut self, entity: Entity);

    /// Take an entity out of its chunk and the loaded-entity list.
    fn remove_entity(&mut self, id: EntityId) -> Option<Entity>;

    /// Register an actor in the active-actor registry.
    fn add_actor(&mut self, actor: ActorId, entity: EntityId);

    fn update_sleeping_flag(&mut self);

    fn tracked_actor(&self, pos: BlockPos, kind: TrackerKind) -> Option<ActorId>;

    fn add_tracked_block_position(
        &mut self,
        block: BlockType,
        pos: BlockPos,
        actor: ActorId,
        kind: TrackerKind,
    );
}
