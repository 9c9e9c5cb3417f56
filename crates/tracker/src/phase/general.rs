use phasetrack_kernel::WorldHost;

use crate::context::PhaseContext;
use crate::error::TrackerError;
use crate::tracker::CauseTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneralState {
    /// Nothing is running. Sits permanently at the bottom of the stack.
    Idle,
}

pub(crate) fn unwind<W: WorldHost>(
    _tracker: &mut CauseTracker<W>,
    _state: GeneralState,
    _context: PhaseContext,
) -> Result<(), TrackerError> {
    Ok(())
}
