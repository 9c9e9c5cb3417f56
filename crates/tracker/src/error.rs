use crate::diagnostics::CrashReport;
use crate::phase::PhaseState;

/// Errors raised by the phase stack and the cause tracker.
///
/// Every variant except [`TrackerError::Reported`] is a programming error in
/// the caller: the tracker never coerces a bad request into a valid one.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("invalid phase state: {0}")]
    InvalidState(String),
    #[error("no active phase: only the idle sentinel is on the stack")]
    EmptyStack,
    #[error("world '{world}' already has a cause tracker")]
    DuplicateTracker { world: String },
    #[error("incompatible phase transition: {from} cannot switch to {to}")]
    InvalidTransition { from: PhaseState, to: PhaseState },
    #[error("phase completed out of order: expected {expected}, top of stack is {found}")]
    OutOfOrder {
        expected: PhaseState,
        found: PhaseState,
    },
    /// A downstream update failed; the report carries where and why.
    #[error(transparent)]
    Reported(Box<CrashReport>),
}

impl TrackerError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// The crash report, if this error was raised by a failed update.
    pub fn report(&self) -> Option<&CrashReport> {
        match self {
            Self::Reported(report) => Some(report),
            _ => None,
        }
    }
}
