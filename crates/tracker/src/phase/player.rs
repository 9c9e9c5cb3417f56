use phasetrack_common::ActorId;
use phasetrack_kernel::WorldHost;

use super::PhaseState;
use crate::cause::PACKET_PLAYER;
use crate::context::PhaseContext;
use crate::error::TrackerError;
use crate::tracker::CauseTracker;

/// Handling of one player input packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    PlaceBlock,
    BreakBlock,
    UseItem,
}

pub(crate) fn unwind<W: WorldHost>(
    tracker: &mut CauseTracker<W>,
    state: PlayerState,
    context: PhaseContext,
) -> Result<(), TrackerError> {
    if context.first_named::<ActorId>(PACKET_PLAYER).is_none() {
        tracing::debug!(?state, "player phase completed without a packet player");
    }
    super::unwind_captures(tracker, PhaseState::Player(state), context)
}
