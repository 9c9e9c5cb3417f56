//! Phase states grouped into tracking-phase families.
//!
//! Every state is a plain value: its policy comes from the tables below and
//! from its family module, and transition legality is one function keyed on
//! the (current, next) pair.

pub mod block;
pub mod general;
pub mod player;
pub mod spawning;
pub mod tick;
pub mod world;

use std::fmt;

use phasetrack_kernel::WorldHost;

use crate::context::PhaseContext;
use crate::error::TrackerError;
use crate::event::SpawnEventKind;
use crate::tracker::CauseTracker;

pub use block::BlockPhaseState;
pub use general::GeneralState;
pub use player::PlayerState;
pub use spawning::SpawningState;
pub use tick::TickState;
pub use world::WorldGenState;

/// A family of related phase states sharing one unwind algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingPhase {
    General,
    Block,
    Spawning,
    World,
    Tick,
    Player,
}

impl TrackingPhase {
    /// Turn a completed frame's captures into committed mutations. Runs
    /// after the frame has been popped.
    pub fn unwind<W: WorldHost>(
        self,
        tracker: &mut CauseTracker<W>,
        state: PhaseState,
        context: PhaseContext,
    ) -> Result<(), TrackerError> {
        if state.phase() != self {
            return Err(TrackerError::InvalidState(format!(
                "{state} does not belong to the {self} phase"
            )));
        }
        match state {
            PhaseState::General(state) => general::unwind(tracker, state, context),
            PhaseState::Block(state) => block::unwind(tracker, state, context),
            PhaseState::Spawning(state) => spawning::unwind(tracker, state, context),
            PhaseState::World(state) => world::unwind(tracker, state, context),
            PhaseState::Tick(state) => tick::unwind(tracker, state, context),
            PhaseState::Player(state) => player::unwind(tracker, state, context),
        }
    }
}

impl fmt::Display for TrackingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::General => "General",
            Self::Block => "Block",
            Self::Spawning => "Spawning",
            Self::World => "World",
            Self::Tick => "Tick",
            Self::Player => "Player",
        };
        f.write_str(name)
    }
}

/// One kind of world-mutating activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseState {
    General(GeneralState),
    Block(BlockPhaseState),
    Spawning(SpawningState),
    World(WorldGenState),
    Tick(TickState),
    Player(PlayerState),
}

impl PhaseState {
    /// The sentinel at the bottom of every stack.
    pub const IDLE: Self = Self::General(GeneralState::Idle);

    pub const ALL: [Self; 19] = [
        Self::IDLE,
        Self::Block(BlockPhaseState::RestoringBlocks),
        Self::Block(BlockPhaseState::PostNotificationEvent),
        Self::Block(BlockPhaseState::BlockDecay),
        Self::Block(BlockPhaseState::Dispense),
        Self::Spawning(SpawningState::DeathDropsSpawning),
        Self::Spawning(SpawningState::DropItem),
        Self::Spawning(SpawningState::ChunkSpawning),
        Self::World(WorldGenState::TerrainGeneration),
        Self::World(WorldGenState::ChunkLoading),
        Self::World(WorldGenState::PopulatorRunning),
        Self::World(WorldGenState::WorldSpawnerSpawning),
        Self::Tick(TickState::TickingBlock),
        Self::Tick(TickState::RandomTickBlock),
        Self::Tick(TickState::TickingEntity),
        Self::Tick(TickState::TickingTileEntity),
        Self::Player(PlayerState::PlaceBlock),
        Self::Player(PlayerState::BreakBlock),
        Self::Player(PlayerState::UseItem),
    ];

    pub fn phase(self) -> TrackingPhase {
        match self {
            Self::General(_) => TrackingPhase::General,
            Self::Block(_) => TrackingPhase::Block,
            Self::Spawning(_) => TrackingPhase::Spawning,
            Self::World(_) => TrackingPhase::World,
            Self::Tick(_) => TrackingPhase::Tick,
            Self::Player(_) => TrackingPhase::Player,
        }
    }

    pub fn is_idle(self) -> bool {
        self == Self::IDLE
    }

    /// Whether the world is mid-mutation while this state is active.
    pub fn is_busy(self) -> bool {
        !self.is_idle()
    }

    pub fn is_ticking(self) -> bool {
        matches!(self, Self::Tick(_))
    }

    /// Asked of the current top state before `next` is pushed over it.
    pub fn can_switch_to(self, next: PhaseState) -> bool {
        use BlockPhaseState as B;
        use SpawningState as S;
        use WorldGenState as W;
        match self {
            Self::General(GeneralState::Idle) => true,
            Self::Block(B::PostNotificationEvent) => {
                matches!(next, Self::Block(_) | Self::Spawning(_))
            }
            Self::Block(_) => false,
            Self::Spawning(S::ChunkSpawning) => next.is_ticking(),
            Self::Spawning(_) => false,
            Self::World(W::TerrainGeneration | W::ChunkLoading) => matches!(
                next,
                Self::Spawning(S::ChunkSpawning) | Self::World(W::PopulatorRunning) | Self::Block(_)
            ),
            Self::World(W::PopulatorRunning) => {
                matches!(next, Self::Spawning(_) | Self::Block(_))
            }
            Self::World(W::WorldSpawnerSpawning) => false,
            Self::Tick(_) | Self::Player(_) => {
                matches!(next, Self::Block(_) | Self::Spawning(_))
            }
        }
    }

    pub fn requires_block_capturing(self) -> bool {
        match self {
            Self::General(_) => false,
            Self::Block(state) => state.requires_block_capturing(),
            Self::Spawning(state) => state.requires_block_capturing(),
            Self::World(state) => state.requires_block_capturing(),
            Self::Tick(_) | Self::Player(_) => true,
        }
    }

    pub fn captures_entity_spawns(self) -> bool {
        match self {
            Self::General(_) => false,
            Self::Block(state) => state.captures_entity_spawns(),
            Self::Spawning(_) => true,
            Self::World(state) => state.captures_entity_spawns(),
            Self::Tick(_) | Self::Player(_) => true,
        }
    }

    /// Item drops requested in this state are refused outright.
    pub fn ignores_item_spawns(self) -> bool {
        self == Self::Block(BlockPhaseState::RestoringBlocks)
    }

    pub fn spawn_event_kind(self) -> SpawnEventKind {
        match self {
            Self::Spawning(SpawningState::ChunkSpawning) => SpawnEventKind::ChunkLoad,
            Self::Spawning(SpawningState::DropItem | SpawningState::DeathDropsSpawning)
            | Self::Block(BlockPhaseState::Dispense) => SpawnEventKind::DropItem,
            _ => SpawnEventKind::Spawn,
        }
    }

    /// Block captures made in this state are reported as decay.
    pub fn is_decaying(self) -> bool {
        self == Self::Block(BlockPhaseState::BlockDecay)
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General(state) => write!(f, "General::{state:?}"),
            Self::Block(state) => write!(f, "Block::{state:?}"),
            Self::Spawning(state) => write!(f, "Spawning::{state:?}"),
            Self::World(state) => write!(f, "World::{state:?}"),
            Self::Tick(state) => write!(f, "Tick::{state:?}"),
            Self::Player(state) => write!(f, "Player::{state:?}"),
        }
    }
}

/// Shared unwind for families that capture both blocks and spawns: block
/// batches first, then entities, then items.
pub(crate) fn unwind_captures<W: WorldHost>(
    tracker: &mut CauseTracker<W>,
    state: PhaseState,
    mut context: PhaseContext,
) -> Result<(), TrackerError> {
    if !context.has_pending_captures() {
        return Ok(());
    }
    let cause = tracker.cause_for(&context);
    let transactions = context.captured_blocks_mut().drain();
    tracker.process_block_captures(state, transactions, &cause)?;
    let entities = context.captured_entities_mut().drain();
    tracker.process_entity_captures(state, entities, &cause)?;
    let items = context.captured_items_mut().drain();
    tracker.process_entity_captures(state, items, &cause)?;
    Ok(())
}
