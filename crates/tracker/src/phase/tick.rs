use phasetrack_common::BlockSnapshot;
use phasetrack_kernel::WorldHost;

use super::PhaseState;
use crate::cause::SOURCE;
use crate::context::PhaseContext;
use crate::error::TrackerError;
use crate::tracker::CauseTracker;

/// One scheduled update from the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickState {
    TickingBlock,
    RandomTickBlock,
    TickingEntity,
    TickingTileEntity,
}

pub(crate) fn unwind<W: WorldHost>(
    tracker: &mut CauseTracker<W>,
    state: TickState,
    context: PhaseContext,
) -> Result<(), TrackerError> {
    if let Some(source) = context.first_named::<BlockSnapshot>(SOURCE) {
        tracing::trace!(?state, block = %source, pending = context.pending_capture_count(), "tick finished");
    }
    super::unwind_captures(tracker, PhaseState::Tick(state), context)
}
