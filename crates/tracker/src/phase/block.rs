use phasetrack_kernel::WorldHost;

use super::PhaseState;
use crate::context::PhaseContext;
use crate::error::TrackerError;
use crate::tracker::CauseTracker;

/// Activity driven by a single block rather than by the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockPhaseState {
    /// Writing a listener-supplied replacement back into the world.
    RestoringBlocks,
    /// Firing the block-added hook for a replayed transaction.
    PostNotificationEvent,
    BlockDecay,
    Dispense,
}

impl BlockPhaseState {
    pub(super) fn requires_block_capturing(self) -> bool {
        matches!(self, Self::BlockDecay | Self::Dispense)
    }

    pub(super) fn captures_entity_spawns(self) -> bool {
        self != Self::RestoringBlocks
    }
}

pub(crate) fn unwind<W: WorldHost>(
    tracker: &mut CauseTracker<W>,
    state: BlockPhaseState,
    context: PhaseContext,
) -> Result<(), TrackerError> {
    super::unwind_captures(tracker, PhaseState::Block(state), context)
}
