use phasetrack_kernel::WorldHost;

use super::PhaseState;
use crate::context::PhaseContext;
use crate::error::TrackerError;
use crate::tracker::CauseTracker;

/// World generation and chunk lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldGenState {
    TerrainGeneration,
    ChunkLoading,
    PopulatorRunning,
    WorldSpawnerSpawning,
}

impl WorldGenState {
    pub(super) fn requires_block_capturing(self) -> bool {
        matches!(self, Self::TerrainGeneration | Self::PopulatorRunning)
    }

    pub(super) fn captures_entity_spawns(self) -> bool {
        self != Self::ChunkLoading
    }
}

pub(crate) fn unwind<W: WorldHost>(
    tracker: &mut CauseTracker<W>,
    state: WorldGenState,
    context: PhaseContext,
) -> Result<(), TrackerError> {
    super::unwind_captures(tracker, PhaseState::World(state), context)
}
