use std::cell::RefCell;
use std::rc::Rc;

use glam::DVec3;
use phasetrack_common::{
    ActorId, BlockPos, BlockSnapshot, BlockState, BlockType, Direction, Entity, EntityKind,
    UpdateFlags,
};
use phasetrack_kernel::{BlockView, World, WorldEvent, WorldHost};
use phasetrack_tracker::cause::{CREATOR, NOTIFIER, SOURCE};
use phasetrack_tracker::{
    BlockBehavior, BlockPhaseState, CaptureType, Cause, CauseTracker, EventBus, NamedCause, PhaseContext,
    PhaseState, PluginId, SupportedBlock, TickState, TrackerConfig, TrackerError, TrackingPhase,
    TransitionPolicy, WorldGenState,
};

const ORIGIN: BlockPos = BlockPos::new(0, 64, 0);

fn world() -> World {
    let mut world = World::new("overworld");
    world.load_area(1);
    world
}

fn tracker() -> CauseTracker {
    CauseTracker::new(world(), TrackerConfig::default()).unwrap()
}

fn grass_source(pos: BlockPos) -> PhaseContext {
    let snapshot = BlockSnapshot::new(pos, BlockState::of(BlockType::GRASS), UpdateFlags::DEFAULT);
    PhaseContext::start()
        .add(NamedCause::source(snapshot))
        .unwrap()
        .complete()
}

#[test]
fn non_capturing_phase_writes_immediately() {
    let mut tracker = tracker();
    tracker
        .switch_to_phase(
            TrackingPhase::World,
            PhaseState::World(WorldGenState::ChunkLoading),
            PhaseContext::start().complete(),
        )
        .unwrap();
    assert!(!tracker.is_capturing_blocks());

    let stone = BlockState::of(BlockType::STONE);
    assert!(tracker.set_block_state(ORIGIN, stone, UpdateFlags::DEFAULT).unwrap());
    assert_eq!(tracker.world().block_state(ORIGIN), Some(stone));
    assert!(!tracker.phases().peek_context().has_pending_captures());
    tracker.complete_phase().unwrap();
}

#[test]
fn capturing_phase_releases_spawns_in_order_with_attribution() {
    let causes = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&causes);
    let mut bus = EventBus::new();
    bus.on_spawn_entity(move |event| {
        let names: Vec<String> = event.cause().names().map(str::to_string).collect();
        seen.borrow_mut().push(names);
    });
    let mut tracker = tracker().with_dispatcher(bus);
    let source = BlockPos::new(3, 64, 3);
    tracker
        .switch_to_phase(
            TrackingPhase::Tick,
            PhaseState::Tick(TickState::TickingBlock),
            grass_source(source),
        )
        .unwrap();

    let (notifier, creator) = (ActorId::new(), ActorId::new());
    let first = Entity::mob("zombie", DVec3::new(1.0, 64.0, 1.0)).with_notifier(notifier);
    let second = Entity::mob("skeleton", DVec3::new(2.0, 64.0, 2.0)).with_creator(creator);
    let ids = [first.id, second.id];
    let cause = tracker.current_cause().unwrap();
    assert!(tracker.process_spawn_entity(first, &cause).unwrap());
    assert!(tracker.process_spawn_entity(second, &cause).unwrap());
    assert_eq!(tracker.world().entity_count(), 0);

    tracker.complete_phase().unwrap();

    assert_eq!(tracker.world().loaded_entities(), &ids);
    let causes = causes.borrow();
    assert_eq!(causes.len(), 1);
    assert_eq!(causes[0], vec![SOURCE, NOTIFIER, CREATOR]);
}

#[test]
fn complete_without_active_phase_is_empty_stack() {
    let mut tracker = tracker();
    assert!(matches!(tracker.complete_phase(), Err(TrackerError::EmptyStack)));
    assert_eq!(tracker.phases().len(), 1);
}

#[test]
fn incomplete_context_is_a_precondition_failure() {
    let mut tracker = tracker();
    let err = tracker
        .switch_to_phase(
            TrackingPhase::Tick,
            PhaseState::Tick(TickState::TickingBlock),
            PhaseContext::start(),
        )
        .unwrap_err();
    assert!(matches!(err, TrackerError::Precondition(_)));
}

#[test]
fn captured_blocks_drain_once() {
    let mut tracker = tracker();
    let state = PhaseState::Tick(TickState::RandomTickBlock);
    tracker
        .switch_to_phase(TrackingPhase::Tick, state, grass_source(ORIGIN))
        .unwrap();
    let dirt = BlockState::of(BlockType::DIRT);
    tracker.set_block_state(ORIGIN, dirt, UpdateFlags::DEFAULT).unwrap();
    assert_eq!(tracker.phases().peek_context().captured_blocks().len(), 1);
    tracker.complete_phase_expecting(state).unwrap();

    assert_eq!(tracker.world().block_state(ORIGIN), Some(dirt));
    assert_eq!(tracker.world().block_changes(), vec![(ORIGIN, dirt)]);
    assert!(!tracker.phases().peek_context().has_pending_captures());
}

#[test]
fn spawn_into_unloaded_chunk_is_refused() {
    let mut tracker = tracker();
    let before = tracker.world().events().len();
    let far = Entity::mob("creeper", DVec3::new(10_000.0, 64.0, 10_000.0));
    let cause = Cause::source(PluginId("test".into()));
    assert!(!tracker.process_spawn_entity(far, &cause).unwrap());
    assert_eq!(tracker.world().events().len(), before);
}

#[test]
fn later_transactions_observe_earlier_ones() {
    let mut tracker = tracker();
    tracker.register_behavior(BlockType::TORCH, SupportedBlock);
    tracker
        .switch_to_phase(
            TrackingPhase::Tick,
            PhaseState::Tick(TickState::TickingBlock),
            grass_source(ORIGIN),
        )
        .unwrap();
    let above = ORIGIN.offset(Direction::Up);
    tracker
        .set_block_state(above, BlockState::of(BlockType::TORCH), UpdateFlags::DEFAULT)
        .unwrap();
    tracker
        .set_block_state(ORIGIN, BlockState::of(BlockType::STONE), UpdateFlags::DEFAULT)
        .unwrap();
    tracker.complete_phase().unwrap();

    // The stone is replayed second and notifies the torch, which finds its
    // support already in place.
    assert_eq!(tracker.world().block_state(above), Some(BlockState::of(BlockType::TORCH)));
    assert_eq!(tracker.world().entity_count(), 0);
}

#[test]
fn breaking_support_cascades_into_a_drop() {
    let mut tracker = tracker();
    tracker.register_behavior(BlockType::TORCH, SupportedBlock);
    let above = ORIGIN.offset(Direction::Up);
    let world = tracker.world_mut();
    world.set_block_state_raw(ORIGIN, BlockState::of(BlockType::STONE));
    world.set_block_state_raw(above, BlockState::of(BlockType::TORCH));

    tracker
        .switch_to_phase(
            TrackingPhase::Tick,
            PhaseState::Tick(TickState::TickingBlock),
            grass_source(ORIGIN.offset(Direction::West)),
        )
        .unwrap();
    tracker
        .set_block_state(ORIGIN, BlockState::AIR, UpdateFlags::DEFAULT)
        .unwrap();
    tracker.complete_phase().unwrap();

    assert_eq!(tracker.world().block_state(ORIGIN), Some(BlockState::AIR));
    assert_eq!(tracker.world().block_state(above), Some(BlockState::AIR));
    let drops: Vec<_> = tracker
        .world()
        .entities()
        .values()
        .filter(|e| matches!(&e.kind, EntityKind::Item { item, .. } if item == "torch"))
        .collect();
    assert_eq!(drops.len(), 1);
    assert!(tracker.phases().is_idle());
}

#[test]
fn vetoed_changes_are_discarded_silently() {
    let mut bus = EventBus::new();
    bus.on_change_block(|event| {
        if event.kind() == CaptureType::Place {
            event.filter(|tx| tx.pos() != ORIGIN);
        }
    });
    bus.on_spawn_entity(|event| event.set_cancelled(true));
    let mut tracker = tracker().with_dispatcher(bus);
    tracker
        .switch_to_phase(
            TrackingPhase::Tick,
            PhaseState::Tick(TickState::TickingBlock),
            grass_source(ORIGIN),
        )
        .unwrap();
    let stone = BlockState::of(BlockType::STONE);
    let east = ORIGIN.offset(Direction::East);
    tracker.set_block_state(ORIGIN, stone, UpdateFlags::DEFAULT).unwrap();
    tracker.set_block_state(east, stone, UpdateFlags::DEFAULT).unwrap();
    let cause = tracker.current_cause().unwrap();
    tracker
        .process_spawn_entity(Entity::mob("pig", DVec3::new(1.0, 65.0, 1.0)), &cause)
        .unwrap();
    tracker.complete_phase().unwrap();

    assert_eq!(tracker.world().block_state(ORIGIN), Some(BlockState::AIR));
    assert_eq!(tracker.world().block_state(east), Some(stone));
    assert_eq!(tracker.world().entity_count(), 0);
}

struct Exploding;

impl BlockBehavior<World> for Exploding {
    fn on_neighbor_changed(
        &self,
        _tracker: &mut CauseTracker<World>,
        _pos: BlockPos,
        _state: BlockState,
        _neighbor: BlockType,
    ) -> Result<(), TrackerError> {
        Err(TrackerError::precondition("neighbour exploded"))
    }
}

#[test]
fn failed_neighbour_update_is_reported_with_position() {
    let mut tracker = tracker();
    tracker.register_behavior(BlockType::GLASS, Exploding);
    let north = ORIGIN.offset(Direction::North);
    tracker
        .world_mut()
        .set_block_state_raw(north, BlockState::of(BlockType::GLASS));

    let err = tracker
        .set_block_state(ORIGIN, BlockState::of(BlockType::STONE), UpdateFlags::DEFAULT)
        .unwrap_err();
    let report = err.report().expect("crash report");
    assert_eq!(report.title(), "Exception while updating neighbours");
    assert_eq!(
        report.detail("Block being updated", "Block location"),
        Some(north.to_string().as_str())
    );
    assert_eq!(
        report.detail("Block being updated", "Source block type"),
        Some(BlockType::AIR.to_string().as_str())
    );
    assert!(matches!(report.cause(), TrackerError::Precondition(_)));
    assert!(report.render().contains("neighbour exploded"));
}

#[test]
fn cloned_world_cannot_get_a_second_tracker() {
    let tracker = tracker();
    let err = CauseTracker::new(tracker.world().clone(), TrackerConfig::default()).unwrap_err();
    assert!(matches!(err, TrackerError::DuplicateTracker { world } if world == "overworld"));
}

#[test]
fn strict_policy_refuses_incompatible_switch() {
    let config = TrackerConfig {
        transition_policy: TransitionPolicy::Strict,
        ..TrackerConfig::default()
    };
    let mut tracker = CauseTracker::new(world(), config).unwrap();
    let restoring = PhaseState::Block(BlockPhaseState::RestoringBlocks);
    tracker
        .switch_to_phase(TrackingPhase::Block, restoring, PhaseContext::start().complete())
        .unwrap();
    let err = tracker
        .switch_to_phase(
            TrackingPhase::Tick,
            PhaseState::Tick(TickState::TickingBlock),
            grass_source(ORIGIN),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TrackerError::InvalidTransition { from, .. } if from == restoring
    ));
    tracker.complete_phase_expecting(restoring).unwrap();
}

#[test]
fn runaway_depth_is_reported_but_not_fatal() {
    let mut tracker = tracker();
    let post = PhaseState::Block(BlockPhaseState::PostNotificationEvent);
    for _ in 0..10 {
        tracker
            .switch_to_phase(TrackingPhase::Block, post, grass_source(ORIGIN))
            .unwrap();
    }
    assert_eq!(tracker.phases().depth(), 10);
    for _ in 0..10 {
        tracker.complete_phase_expecting(post).unwrap();
    }
    assert!(tracker.phases().is_idle());
    assert!(!tracker
        .world()
        .events()
        .iter()
        .any(|e| matches!(e, WorldEvent::BlockChanged { .. })));
}

#[test]
fn placement_by_player_tracks_creator_and_notifier() {
    let actor = ActorId::new();
    let mut tracker = tracker();
    let context = PhaseContext::start()
        .add(NamedCause::of(phasetrack_tracker::cause::PACKET_PLAYER, actor))
        .unwrap()
        .complete();
    let place = PhaseState::Player(phasetrack_tracker::PlayerState::PlaceBlock);
    tracker
        .with_phase(place, context, |tracker| {
            tracker.set_block_state(ORIGIN, BlockState::of(BlockType::STONE), UpdateFlags::DEFAULT)
        })
        .unwrap();

    assert_eq!(tracker.world().creator(ORIGIN), Some(actor));
    // A tick sourced at the placed block passes its creator on as notifier.
    let below = ORIGIN.offset(Direction::Down);
    tracker
        .world_mut()
        .set_block_state_raw(below, BlockState::of(BlockType::DIRT));
    tracker
        .switch_to_phase(
            TrackingPhase::Tick,
            PhaseState::Tick(TickState::TickingBlock),
            grass_source(ORIGIN),
        )
        .unwrap();
    tracker
        .notify_block_of_state_change(below, BlockType::STONE, ORIGIN)
        .unwrap();
    tracker.complete_phase().unwrap();
    assert_eq!(tracker.world().notifier(below), Some(actor));
}
