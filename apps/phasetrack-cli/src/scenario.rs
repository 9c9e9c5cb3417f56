use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::rc::Rc;

use clap::ValueEnum;
use glam::DVec3;
use phasetrack_common::{ActorId, BlockPos, BlockSnapshot, BlockState, BlockType, Direction, Entity, UpdateFlags};
use phasetrack_kernel::{World, WorldHost};
use phasetrack_tools::{TrackerInspector, WorldInspector};
use phasetrack_tracker::cause::PACKET_PLAYER;
use phasetrack_tracker::{
    BlockPhaseState, CaptureType, Cause, CauseTracker, CauseValue, ConnectingBlock, EventBus, NamedCause, PhaseContext,
    PhaseState, PlayerState, SpawningState, SupportedBlock, TickState, TrackerConfig, TrackerError,
    WorldGenState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// A player places a torch on a block
    Place,
    /// Terrain generation spawning mobs into a new chunk
    ChunkSpawn,
    /// Breaking a block knocks off the torch resting on it
    Cascade,
    /// Listeners veto part of a tick's changes
    Veto,
    /// A phase that never completes stacks up
    Runaway,
}

/// Everything a scenario produced, ready to print.
pub struct ScenarioReport {
    pub name: Scenario,
    pub world_log: Vec<String>,
    pub events: Vec<String>,
    pub world_summary: String,
    pub tracker_summary: String,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== scenario {:?} ==", self.name)?;
        writeln!(f, "-- world log --")?;
        for line in &self.world_log {
            writeln!(f, "  {line}")?;
        }
        writeln!(f, "-- events --")?;
        for line in &self.events {
            writeln!(f, "  {line}")?;
        }
        writeln!(f, "{}", self.world_summary)?;
        writeln!(f, "{}", self.tracker_summary)
    }
}

type Record = Rc<RefCell<Vec<String>>>;

/// A bus that records every event it sees, with an optional veto hook.
fn recording_bus(record: &Record, veto: bool) -> EventBus {
    let mut bus = EventBus::new();
    let seen = Rc::clone(record);
    bus.on_construct(move |event| {
        seen.borrow_mut()
            .push(format!("construct {:?}", event.entity.kind));
    });
    let seen = Rc::clone(record);
    bus.on_change_block(move |event| {
        if veto && event.kind() == CaptureType::Break {
            event.set_cancelled(true);
        }
        let mut line = format!(
            "change-block {} x{} cancelled={} cause=[{}]",
            event.kind(),
            event.transactions().len(),
            event.is_cancelled(),
            event.cause().names().collect::<Vec<_>>().join(", ")
        );
        for tx in event.transactions() {
            let _ = write!(line, " {}->{}", tx.original(), tx.final_snapshot().state);
        }
        seen.borrow_mut().push(line);
    });
    let seen = Rc::clone(record);
    bus.on_spawn_entity(move |event| {
        if veto {
            event.filter_entities(|entity| !entity.is_item());
        }
        seen.borrow_mut().push(format!(
            "spawn {:?} x{} (proposed {}) cause=[{}]",
            event.kind(),
            event.entities().len(),
            event.snapshots().len(),
            event.cause().names().collect::<Vec<_>>().join(", ")
        ));
    });
    bus
}

fn tick_context(pos: BlockPos, state: BlockState) -> Result<PhaseContext, TrackerError> {
    Ok(PhaseContext::start()
        .add(NamedCause::source(BlockSnapshot::new(pos, state, UpdateFlags::DEFAULT)))?
        .complete())
}

fn current_or_world(tracker: &CauseTracker) -> Cause {
    tracker
        .current_cause()
        .unwrap_or_else(|| Cause::source(CauseValue::World(tracker.world().name().to_string())))
}

pub fn run(name: Scenario, config: TrackerConfig) -> anyhow::Result<ScenarioReport> {
    let mut world = World::new("overworld");
    world.load_area(1);
    let record: Record = Rc::default();
    let mut tracker = CauseTracker::new(world, config)?.with_dispatcher(recording_bus(&record, name == Scenario::Veto));
    tracker.register_behavior(BlockType::TORCH, SupportedBlock);
    tracker.register_behavior(BlockType::REDSTONE_WIRE, ConnectingBlock);

    match name {
        Scenario::Place => place(&mut tracker)?,
        Scenario::ChunkSpawn => chunk_spawn(&mut tracker)?,
        Scenario::Cascade | Scenario::Veto => cascade(&mut tracker)?,
        Scenario::Runaway => runaway(&mut tracker)?,
    }

    let tracker_summary = TrackerInspector::summary(&tracker).to_string();
    let world = tracker.into_world();
    let events = record.borrow().clone();
    Ok(ScenarioReport {
        name,
        world_log: world.events().iter().map(|e| format!("{e:?}")).collect(),
        events,
        world_summary: WorldInspector::summary(&world).to_string(),
        tracker_summary,
    })
}

fn place(tracker: &mut CauseTracker) -> Result<(), TrackerError> {
    let actor = ActorId::new();
    let player = Entity::player(actor, DVec3::new(0.5, 65.0, 2.5)).constructing();
    let join = Cause::source(actor);
    tracker.process_spawn_entity(player, &join)?;

    let ground = BlockPos::new(0, 64, 0);
    let context = PhaseContext::start()
        .add(NamedCause::of(PACKET_PLAYER, actor))?
        .complete();
    tracker.with_phase(PhaseState::Player(PlayerState::PlaceBlock), context, |tracker| {
        tracker.set_block_state(ground, BlockState::of(BlockType::STONE), UpdateFlags::DEFAULT)?;
        tracker.set_block_state(
            ground.offset(Direction::Up),
            BlockState::of(BlockType::TORCH),
            UpdateFlags::DEFAULT,
        )?;
        tracker.set_block_state(
            ground.offset(Direction::East),
            BlockState::of(BlockType::REDSTONE_WIRE),
            UpdateFlags::DEFAULT,
        )
    })?;
    Ok(())
}

fn chunk_spawn(tracker: &mut CauseTracker) -> Result<(), TrackerError> {
    let context = PhaseContext::start()
        .add(NamedCause::of("World", CauseValue::World("overworld".into())))?
        .complete();
    let terrain = PhaseState::World(WorldGenState::TerrainGeneration);
    tracker.with_phase(terrain, context, |tracker| {
        for x in 0..4 {
            tracker.set_block_state(BlockPos::new(x, 63, 0), BlockState::of(BlockType::GRASS), UpdateFlags::DEFAULT)?;
        }
        let spawning = PhaseState::Spawning(SpawningState::ChunkSpawning);
        let context = tick_context(BlockPos::new(0, 63, 0), BlockState::of(BlockType::GRASS))?;
        tracker.with_phase(spawning, context, |tracker| {
            let cause = current_or_world(tracker);
            for (i, mob) in ["sheep", "cow", "pig"].into_iter().enumerate() {
                let position = DVec3::new(i as f64 * 2.0, 64.0, 1.0);
                tracker.process_spawn_entity(Entity::mob(mob, position), &cause)?;
            }
            Ok(())
        })
    })
}

fn cascade(tracker: &mut CauseTracker) -> Result<(), TrackerError> {
    let ground = BlockPos::new(0, 64, 0);
    let world = tracker.world_mut();
    world.set_block_state_raw(ground, BlockState::of(BlockType::STONE));
    world.set_block_state_raw(ground.offset(Direction::Up), BlockState::of(BlockType::TORCH));

    let neighbour = ground.offset(Direction::West);
    let context = tick_context(neighbour, BlockState::of(BlockType::SAND))?;
    tracker.with_phase(PhaseState::Tick(TickState::TickingBlock), context, |tracker| {
        tracker.set_block_state(ground, BlockState::AIR, UpdateFlags::DEFAULT)?;
        let cause = current_or_world(tracker);
        tracker.process_spawn_entity(Entity::item("stone", 1, ground.center()), &cause)?;
        Ok(())
    })
}

fn runaway(tracker: &mut CauseTracker) -> Result<(), TrackerError> {
    let post = PhaseState::Block(BlockPhaseState::PostNotificationEvent);
    let depth = tracker.config().runaway_depth_threshold + 2;
    for level in 0..depth {
        let pos = BlockPos::new(level as i32, 64, 0);
        tracker.switch_to_phase(post.phase(), post, tick_context(pos, BlockState::of(BlockType::GLOWSTONE))?)?;
    }
    tracing::info!(depth = tracker.phases().depth(), "stack built; unwinding");
    for _ in 0..depth {
        tracker.complete_phase_expecting(post)?;
    }
    Ok(())
}
