//! The cause tracker: one per world, routing every mutation through the
//! phase stack before it reaches the simulation.

mod blocks;
mod entities;

pub use blocks::BlockReplay;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use phasetrack_common::{BlockType, EntityId};
use phasetrack_kernel::{World, WorldHost};

use crate::behavior::{BehaviorRegistry, BlockBehavior};
use crate::cause::{Cause, CauseValue};
use crate::config::TrackerConfig;
use crate::context::PhaseContext;
use crate::error::TrackerError;
use crate::event::{EventDispatcher, NoopDispatcher};
use crate::phase::{PhaseState, TrackingPhase};
use crate::stack::{PhaseData, PhaseStack};

/// Façade bound to exactly one world.
pub struct CauseTracker<W: WorldHost = World> {
    world: W,
    phases: PhaseStack,
    capture_blocks: bool,
    behaviors: BehaviorRegistry<W>,
    events: Box<dyn EventDispatcher>,
    config: TrackerConfig,
    lightning_causes: HashMap<EntityId, Cause>,
}

impl<W: WorldHost> CauseTracker<W> {
    /// Attach a tracker to `world`. Fails if the world already has one.
    pub fn new(mut world: W, config: TrackerConfig) -> Result<Self, TrackerError> {
        if world.tracker_attached() {
            return Err(TrackerError::DuplicateTracker {
                world: world.name().to_string(),
            });
        }
        world.set_tracker_attached(true);
        tracing::debug!(world = world.name(), ?config, "cause tracker attached");
        Ok(Self {
            world,
            phases: PhaseStack::new(&config),
            capture_blocks: false,
            behaviors: BehaviorRegistry::default(),
            events: Box::new(NoopDispatcher),
            config,
            lightning_causes: HashMap::new(),
        })
    }

    pub fn with_dispatcher(mut self, dispatcher: impl EventDispatcher + 'static) -> Self {
        self.events = Box::new(dispatcher);
        self
    }

    pub fn register_behavior(&mut self, block: BlockType, behavior: impl BlockBehavior<W> + 'static) {
        self.behaviors.register(block, Rc::new(behavior));
    }

    /// Detach and hand the world back.
    pub fn into_world(mut self) -> W {
        self.world.set_tracker_attached(false);
        self.world
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Direct access to the world. Writes made through it are not tracked.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn phases(&self) -> &PhaseStack {
        &self.phases
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn current_state(&self) -> PhaseState {
        self.phases.peek_state()
    }

    /// The causes declared by the top frame, if it declared any.
    pub fn current_cause(&self) -> Option<Cause> {
        self.phases.peek_context().to_cause()
    }

    /// Capture block changes in every non-idle phase, not just those whose
    /// state asks for it.
    pub fn set_capture_blocks(&mut self, capture: bool) {
        self.capture_blocks = capture;
    }

    /// The cause a lightning bolt was spawned with.
    pub fn lightning_cause(&self, id: EntityId) -> Option<&Cause> {
        self.lightning_causes.get(&id)
    }

    #[track_caller]
    pub fn switch_to_phase(
        &mut self,
        phase: TrackingPhase,
        state: PhaseState,
        context: PhaseContext,
    ) -> Result<(), TrackerError> {
        if state.phase() != phase {
            return Err(TrackerError::precondition(format!(
                "{state} does not belong to the {phase} phase"
            )));
        }
        if !context.is_complete() {
            return Err(TrackerError::precondition(format!(
                "phase context for {state} must be complete"
            )));
        }
        self.phases.push(state, context)
    }

    /// Pop the top frame and unwind it.
    #[track_caller]
    pub fn complete_phase(&mut self) -> Result<(), TrackerError> {
        let frame = self.phases.pop()?;
        self.unwind(frame)
    }

    /// Like [`complete_phase`](Self::complete_phase), but fails with
    /// `OutOfOrder` unless the top frame is `state`.
    #[track_caller]
    pub fn complete_phase_expecting(&mut self, state: PhaseState) -> Result<(), TrackerError> {
        let frame = self.phases.pop_expecting(state)?;
        self.unwind(frame)
    }

    /// Run `body` inside `state`, completing it afterwards. If `body` fails
    /// the frame is popped and its captures are discarded.
    #[track_caller]
    pub fn with_phase<R>(
        &mut self,
        state: PhaseState,
        context: PhaseContext,
        body: impl FnOnce(&mut Self) -> Result<R, TrackerError>,
    ) -> Result<R, TrackerError> {
        self.switch_to_phase(state.phase(), state, context)?;
        match body(self) {
            Ok(value) => {
                self.complete_phase_expecting(state)?;
                Ok(value)
            }
            Err(err) => {
                match self.phases.pop_expecting(state) {
                    Ok(frame) => tracing::warn!(
                        %state,
                        discarded = frame.context.pending_capture_count(),
                        error = %err,
                        "phase aborted"
                    ),
                    Err(pop_err) => tracing::error!(%state, error = %pop_err, "could not pop aborted phase"),
                }
                Err(err)
            }
        }
    }

    fn unwind(&mut self, frame: PhaseData) -> Result<(), TrackerError> {
        let PhaseData { state, context } = frame;
        let span = tracing::debug_span!("unwind", %state, depth = self.phases.depth());
        let _guard = span.enter();
        state.phase().unwind(self, state, context)
    }

    /// The context's causes, or the world itself when it declared none.
    pub(crate) fn cause_for(&self, context: &PhaseContext) -> Cause {
        context
            .to_cause()
            .unwrap_or_else(|| Cause::source(CauseValue::World(self.world.name().to_string())))
    }

    pub(crate) fn world_name(&self) -> String {
        self.world.name().to_string()
    }
}

impl<W: WorldHost> fmt::Debug for CauseTracker<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CauseTracker")
            .field("world", &self.world.name())
            .field("phases", &self.phases.current_states())
            .field("capture_blocks", &self.capture_blocks)
            .field("behaviors", &self.behaviors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cause::{NamedCause, PluginId};
    use crate::phase::{SpawningState, TickState};
    use phasetrack_common::ChunkPos;

    fn tracker() -> CauseTracker {
        let mut world = World::new("overworld");
        world.load_chunk(ChunkPos::new(0, 0), true);
        CauseTracker::new(world, TrackerConfig::default()).unwrap()
    }

    fn plugin_context() -> PhaseContext {
        PhaseContext::start()
            .add(NamedCause::source(PluginId("test".into())))
            .unwrap()
            .complete()
    }

    const TICK: PhaseState = PhaseState::Tick(TickState::TickingEntity);

    #[test]
    fn second_tracker_for_same_world_rejected() {
        let tracker = tracker();
        let world = tracker.world().clone();
        let err = CauseTracker::new(world, TrackerConfig::default()).unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateTracker { .. }));
    }

    #[test]
    fn detached_world_accepts_a_new_tracker() {
        let world = tracker().into_world();
        assert!(!world.tracker_attached());
        assert!(CauseTracker::new(world, TrackerConfig::default()).is_ok());
    }

    #[test]
    fn switch_rejects_wrong_family() {
        let mut tracker = tracker();
        let err = tracker
            .switch_to_phase(TrackingPhase::Block, TICK, plugin_context())
            .unwrap_err();
        assert!(matches!(err, TrackerError::Precondition(_)));
    }

    #[test]
    fn switch_rejects_incomplete_context() {
        let mut tracker = tracker();
        let err = tracker
            .switch_to_phase(TrackingPhase::Tick, TICK, PhaseContext::start())
            .unwrap_err();
        assert!(matches!(err, TrackerError::Precondition(_)));
        assert_eq!(tracker.phases().depth(), 0);
    }

    #[test]
    fn complete_without_phase_fails() {
        let mut tracker = tracker();
        assert!(matches!(tracker.complete_phase(), Err(TrackerError::EmptyStack)));
    }

    #[test]
    fn switch_then_complete() {
        let mut tracker = tracker();
        tracker
            .switch_to_phase(TrackingPhase::Tick, TICK, plugin_context())
            .unwrap();
        assert_eq!(tracker.current_state(), TICK);
        assert!(tracker.current_cause().is_some());
        tracker.complete_phase().unwrap();
        assert!(tracker.phases().is_idle());
    }

    #[test]
    fn complete_expecting_detects_out_of_order() {
        let mut tracker = tracker();
        tracker
            .switch_to_phase(TrackingPhase::Tick, TICK, plugin_context())
            .unwrap();
        let err = tracker
            .complete_phase_expecting(PhaseState::Spawning(SpawningState::DropItem))
            .unwrap_err();
        assert!(matches!(err, TrackerError::OutOfOrder { .. }));
        tracker.complete_phase_expecting(TICK).unwrap();
    }

    #[test]
    fn with_phase_pops_on_error() {
        let mut tracker = tracker();
        let result: Result<(), _> = tracker.with_phase(TICK, plugin_context(), |_| {
            Err(TrackerError::precondition("boom"))
        });
        assert!(result.is_err());
        assert!(tracker.phases().is_idle());

        let value = tracker
            .with_phase(TICK, plugin_context(), |t| Ok(t.phases().depth()))
            .unwrap();
        assert_eq!(value, 1);
        assert!(tracker.phases().is_idle());
    }

    #[test]
    fn empty_context_falls_back_to_world_cause() {
        let tracker = tracker();
        let cause = tracker.cause_for(&PhaseContext::start().complete());
        assert_eq!(cause.root().value, CauseValue::World("overworld".into()));
    }
}
