use phasetrack_kernel::WorldHost;

use super::PhaseState;
use crate::context::PhaseContext;
use crate::error::TrackerError;
use crate::tracker::CauseTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawningState {
    DeathDropsSpawning,
    DropItem,
    /// Entities arriving with a freshly generated or loaded chunk.
    ChunkSpawning,
}

impl SpawningState {
    pub(super) fn requires_block_capturing(self) -> bool {
        self == Self::ChunkSpawning
    }
}

pub(crate) fn unwind<W: WorldHost>(
    tracker: &mut CauseTracker<W>,
    state: SpawningState,
    context: PhaseContext,
) -> Result<(), TrackerError> {
    let entities = context.captured_entities().len();
    let items = context.captured_items().len();
    if entities + items > 0 {
        tracing::debug!(?state, entities, items, "releasing captured spawns");
    }
    super::unwind_captures(tracker, PhaseState::Spawning(state), context)
}
