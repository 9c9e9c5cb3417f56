use std::backtrace::Backtrace;
use std::panic::Location;

use crate::config::{TrackerConfig, TransitionPolicy};
use crate::context::PhaseContext;
use crate::diagnostics::{self, PrettyPrinter};
use crate::error::TrackerError;
use crate::phase::PhaseState;

/// One frame: the activity and its context.
#[derive(Debug, Clone)]
pub struct PhaseData {
    pub state: PhaseState,
    pub context: PhaseContext,
}

/// Push-down stack of nested activity. The idle sentinel lives below the
/// pushed frames and can never be popped.
#[derive(Debug)]
pub struct PhaseStack {
    sentinel: PhaseData,
    frames: Vec<PhaseData>,
    threshold: usize,
    policy: TransitionPolicy,
    capture_backtraces: bool,
}

impl Default for PhaseStack {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

impl PhaseStack {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            sentinel: PhaseData {
                state: PhaseState::IDLE,
                context: PhaseContext::sentinel(),
            },
            frames: Vec::new(),
            threshold: config.runaway_depth_threshold,
            policy: config.transition_policy,
            capture_backtraces: config.capture_backtraces,
        }
    }

    #[track_caller]
    pub fn push(&mut self, state: PhaseState, context: PhaseContext) -> Result<(), TrackerError> {
        self.push_frame(state, context, true)
    }

    /// Push a state the tracker enters on its own while replaying captures.
    /// The transition table is not consulted; any state may host a replay.
    #[track_caller]
    pub(crate) fn push_replay(&mut self, state: PhaseState, context: PhaseContext) -> Result<(), TrackerError> {
        self.push_frame(state, context, false)
    }

    #[track_caller]
    fn push_frame(
        &mut self,
        state: PhaseState,
        context: PhaseContext,
        check_transition: bool,
    ) -> Result<(), TrackerError> {
        if state.is_idle() {
            return Err(TrackerError::InvalidState(
                "the idle sentinel cannot be pushed".into(),
            ));
        }
        if !context.is_complete() {
            return Err(TrackerError::InvalidState(format!(
                "context for {state} was not completed before being pushed"
            )));
        }
        let location = Location::caller();
        if self.len() > self.threshold {
            let printer = diagnostics::runaway_report(
                "Switching Phase",
                "Entering",
                state,
                &self.current_states(),
                location,
                self.backtrace().as_ref(),
            );
            emit(&printer);
        }
        let current = self.peek_state();
        if check_transition && !current.can_switch_to(state) {
            let printer = diagnostics::incompatible_report(
                current,
                state,
                &self.current_states(),
                location,
                self.backtrace().as_ref(),
            );
            emit(&printer);
            if self.policy == TransitionPolicy::Strict {
                return Err(TrackerError::InvalidTransition {
                    from: current,
                    to: state,
                });
            }
        }
        self.frames.push(PhaseData { state, context });
        Ok(())
    }

    #[track_caller]
    pub fn pop(&mut self) -> Result<PhaseData, TrackerError> {
        let Some(top) = self.frames.last() else {
            return Err(TrackerError::EmptyStack);
        };
        if self.len() > self.threshold {
            let printer = diagnostics::runaway_report(
                "Completing Phase",
                "Completing",
                top.state,
                &self.current_states(),
                Location::caller(),
                self.backtrace().as_ref(),
            );
            emit(&printer);
        }
        self.frames.pop().ok_or(TrackerError::EmptyStack)
    }

    /// Pop the top frame only if it is `expected`.
    #[track_caller]
    pub fn pop_expecting(&mut self, expected: PhaseState) -> Result<PhaseData, TrackerError> {
        let found = self.peek_state();
        if self.frames.is_empty() {
            return Err(TrackerError::EmptyStack);
        }
        if found != expected {
            return Err(TrackerError::OutOfOrder { expected, found });
        }
        self.pop()
    }

    pub fn peek(&self) -> &PhaseData {
        self.frames.last().unwrap_or(&self.sentinel)
    }

    pub fn peek_state(&self) -> PhaseState {
        self.peek().state
    }

    pub fn peek_context(&self) -> &PhaseContext {
        &self.peek().context
    }

    pub fn peek_context_mut(&mut self) -> &mut PhaseContext {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.context,
            None => &mut self.sentinel.context,
        }
    }

    /// Frame count, sentinel included.
    pub fn len(&self) -> usize {
        self.frames.len() + 1
    }

    /// Number of pushed frames above the sentinel.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_idle(&self) -> bool {
        self.frames.is_empty()
    }

    /// States bottom to top, sentinel first.
    pub fn current_states(&self) -> Vec<PhaseState> {
        std::iter::once(self.sentinel.state)
            .chain(self.frames.iter().map(|frame| frame.state))
            .collect()
    }

    /// Pushed frames bottom to top.
    pub fn frames(&self) -> &[PhaseData] {
        &self.frames
    }

    pub(crate) fn frames_mut(&mut self) -> &mut [PhaseData] {
        &mut self.frames
    }

    fn backtrace(&self) -> Option<Backtrace> {
        self.capture_backtraces.then(Backtrace::force_capture)
    }
}

fn emit(printer: &PrettyPrinter) {
    tracing::warn!(target: "phasetrack::diagnostics", "\n{printer}");
}
