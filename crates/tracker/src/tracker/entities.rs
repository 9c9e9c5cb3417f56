use phasetrack_common::{Entity, EntityId, EntityKind};
use phasetrack_kernel::WorldHost;

use super::CauseTracker;
use crate::cause::{Cause, CREATOR, NOTIFIER};
use crate::error::TrackerError;
use crate::event::{ConstructEntityEvent, SpawnEntityEvent};
use crate::phase::PhaseState;

impl<W: WorldHost> CauseTracker<W> {
    /// Spawn an entity, or capture it for the active phase to release on
    /// unwind. Returns whether the entity was spawned or captured.
    ///
    /// Actors are never captured and always spawn. Other entities aimed at
    /// an unloaded chunk are refused unless force-flagged.
    pub fn process_spawn_entity(&mut self, mut entity: Entity, cause: &Cause) -> Result<bool, TrackerError> {
        if entity.in_construct_phase {
            entity.in_construct_phase = false;
            let event = ConstructEntityEvent {
                entity: entity.snapshot(),
                world: self.world_name(),
            };
            self.events.construct_entity_post(&event);
        }

        let state = self.phases.peek_state();
        let remote = self.world.is_remote();
        if !remote && entity.is_item() && state.ignores_item_spawns() {
            tracing::trace!(%state, entity = ?entity.id, "item spawn ignored");
            return Ok(false);
        }
        let chunk = entity.chunk();
        let actor = entity.actor();
        let forced = entity.force_spawn || actor.is_some();
        if !forced && !self.world.is_chunk_loaded(chunk) {
            tracing::trace!(%chunk, entity = ?entity.id, "spawn refused: chunk not loaded");
            return Ok(false);
        }

        if let Some(actor) = actor {
            self.world.add_actor(actor, entity.id);
            self.world.update_sleeping_flag();
            self.world.add_entity(entity);
            return Ok(true);
        }

        if !remote && state.captures_entity_spawns() {
            let context = self.phases.peek_context_mut();
            if entity.is_item() {
                context.captured_items_mut().record(entity);
            } else {
                context.captured_entities_mut().record(entity);
            }
            return Ok(true);
        }

        let entity_cause = spawn_cause(cause, std::slice::from_ref(&entity));
        let mut event = SpawnEntityEvent::new(state.spawn_event_kind(), entity_cause, self.world_name(), vec![entity]);
        self.events.spawn_entity(&mut event);
        let survivors = event.into_entities();
        let spawned = !survivors.is_empty();
        for entity in survivors {
            self.add_to_world(entity, cause);
        }
        Ok(spawned)
    }

    /// Take an entity out of the world, dropping anything the tracker kept
    /// about it.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.lightning_causes.remove(&id);
        self.world.remove_entity(id)
    }

    fn add_to_world(&mut self, entity: Entity, cause: &Cause) {
        if entity.kind == EntityKind::LightningBolt {
            self.lightning_causes.insert(entity.id, cause.clone());
        }
        self.world.add_entity(entity);
    }

    /// Release one batch of captured entities: a single spawn event, then
    /// the survivors in submission order.
    pub(crate) fn process_entity_captures(
        &mut self,
        state: PhaseState,
        entities: Vec<Entity>,
        cause: &Cause,
    ) -> Result<(), TrackerError> {
        if entities.is_empty() {
            return Ok(());
        }
        let base = cause;
        let cause = spawn_cause(base, &entities);
        let mut event = SpawnEntityEvent::new(state.spawn_event_kind(), cause, self.world_name(), entities);
        self.events.spawn_entity(&mut event);
        if event.is_cancelled() {
            tracing::debug!(%state, count = event.entities().len(), "spawn event cancelled");
            return Ok(());
        }
        for entity in event.into_entities() {
            if !entity.force_spawn && !self.world.is_chunk_loaded(entity.chunk()) {
                tracing::trace!(entity = ?entity.id, "captured spawn dropped: chunk unloaded");
                continue;
            }
            self.add_to_world(entity, base);
        }
        Ok(())
    }
}

/// `base` followed by each entity's notifier then creator.
fn spawn_cause(base: &Cause, entities: &[Entity]) -> Cause {
    let mut cause = base.clone();
    for entity in entities {
        if let Some(notifier) = entity.notifier {
            cause.append(NOTIFIER, notifier);
        }
        if let Some(creator) = entity.creator {
            cause.append(CREATOR, creator);
        }
    }
    cause
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cause::{NamedCause, PluginId};
    use crate::config::TrackerConfig;
    use crate::context::PhaseContext;
    use crate::event::{EventBus, SpawnEventKind};
    use crate::phase::{BlockPhaseState, SpawningState, TickState, TrackingPhase};
    use glam::DVec3;
    use phasetrack_common::{ActorId, ChunkPos};
    use phasetrack_kernel::{World, WorldEvent};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tracker() -> CauseTracker {
        let mut world = World::new("entities");
        world.load_chunk(ChunkPos::new(0, 0), true);
        CauseTracker::new(world, TrackerConfig::default()).unwrap()
    }

    fn cause() -> Cause {
        Cause::source(PluginId("spawner".into()))
    }

    fn enter(tracker: &mut CauseTracker, state: PhaseState) {
        let context = PhaseContext::start()
            .add(NamedCause::source(PluginId("phase".into())))
            .unwrap()
            .complete();
        tracker.switch_to_phase(state.phase(), state, context).unwrap();
    }

    const INSIDE: DVec3 = DVec3::new(4.0, 64.0, 4.0);
    const OUTSIDE: DVec3 = DVec3::new(500.0, 64.0, 500.0);

    #[test]
    fn idle_spawn_is_immediate() {
        let mut tracker = tracker();
        assert!(tracker.process_spawn_entity(Entity::mob("cow", INSIDE), &cause()).unwrap());
        assert_eq!(tracker.world().entity_count(), 1);
    }

    #[test]
    fn unloaded_chunk_refused_unless_forced() {
        let mut tracker = tracker();
        assert!(!tracker.process_spawn_entity(Entity::mob("cow", OUTSIDE), &cause()).unwrap());
        assert!(tracker.world().events().iter().all(|e| !matches!(e, WorldEvent::EntityAdded { .. })));
        assert!(tracker
            .process_spawn_entity(Entity::mob("cow", OUTSIDE).forced(), &cause())
            .unwrap());
        assert_eq!(tracker.world().entity_count(), 1);
    }

    #[test]
    fn actors_bypass_capture() {
        let mut tracker = tracker();
        enter(&mut tracker, PhaseState::Tick(TickState::TickingEntity));
        let actor = ActorId::new();
        assert!(tracker
            .process_spawn_entity(Entity::player(actor, OUTSIDE), &cause())
            .unwrap());
        assert_eq!(tracker.world().actors(), &[actor]);
        assert!(!tracker.phases().peek_context().has_pending_captures());
        tracker.complete_phase().unwrap();
    }

    #[test]
    fn restoring_blocks_drops_items() {
        let mut tracker = tracker();
        enter(&mut tracker, PhaseState::Block(BlockPhaseState::RestoringBlocks));
        assert!(!tracker
            .process_spawn_entity(Entity::item("stone", 1, INSIDE), &cause())
            .unwrap());
        assert!(tracker.process_spawn_entity(Entity::mob("bat", INSIDE), &cause()).unwrap());
        tracker.complete_phase().unwrap();
        assert_eq!(tracker.world().entity_count(), 1);
    }

    #[test]
    fn items_and_entities_captured_separately() {
        let mut tracker = tracker();
        enter(&mut tracker, PhaseState::Spawning(SpawningState::DeathDropsSpawning));
        tracker.process_spawn_entity(Entity::item("bone", 2, INSIDE), &cause()).unwrap();
        tracker.process_spawn_entity(Entity::mob("xp_orb", INSIDE), &cause()).unwrap();
        let context = tracker.phases().peek_context();
        assert_eq!(context.captured_items().len(), 1);
        assert_eq!(context.captured_entities().len(), 1);
        assert_eq!(tracker.world().entity_count(), 0);
        tracker.complete_phase().unwrap();
        assert_eq!(tracker.world().entity_count(), 2);
    }

    #[test]
    fn construct_event_fires_once() {
        let constructed = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&constructed);
        let mut bus = EventBus::new();
        bus.on_construct(move |_| *counter.borrow_mut() += 1);
        let mut tracker = tracker().with_dispatcher(bus);
        tracker
            .process_spawn_entity(Entity::mob("sheep", INSIDE).constructing(), &cause())
            .unwrap();
        tracker.process_spawn_entity(Entity::mob("sheep", INSIDE), &cause()).unwrap();
        assert_eq!(*constructed.borrow(), 1);
    }

    #[test]
    fn lightning_keeps_its_cause() {
        let mut tracker = tracker();
        let bolt = Entity::new(EntityKind::LightningBolt, INSIDE);
        let id = bolt.id;
        tracker.process_spawn_entity(bolt, &cause()).unwrap();
        assert_eq!(tracker.lightning_cause(id), Some(&cause()));
    }

    #[test]
    fn lightning_cause_lives_as_long_as_the_bolt() {
        let mut tracker = tracker();
        let refused = Entity::new(EntityKind::LightningBolt, OUTSIDE);
        let refused_id = refused.id;
        assert!(!tracker.process_spawn_entity(refused, &cause()).unwrap());
        assert_eq!(tracker.lightning_cause(refused_id), None);

        let bolt = Entity::new(EntityKind::LightningBolt, INSIDE);
        let id = bolt.id;
        tracker.process_spawn_entity(bolt, &cause()).unwrap();
        assert!(tracker.remove_entity(id).is_some());
        assert_eq!(tracker.lightning_cause(id), None);
        assert!(tracker.world().entity(id).is_none());
    }

    #[test]
    fn chunk_spawning_fires_chunk_load_event() {
        let kinds = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&kinds);
        let mut bus = EventBus::new();
        bus.on_spawn_entity(move |event| seen.borrow_mut().push(event.kind()));
        let mut tracker = tracker().with_dispatcher(bus);
        enter(&mut tracker, PhaseState::Spawning(SpawningState::ChunkSpawning));
        tracker.process_spawn_entity(Entity::mob("pig", INSIDE), &cause()).unwrap();
        tracker.complete_phase().unwrap();
        assert_eq!(*kinds.borrow(), vec![SpawnEventKind::ChunkLoad]);
    }

    #[test]
    fn filtered_entities_do_not_spawn() {
        let mut bus = EventBus::new();
        bus.on_spawn_entity(|event| event.filter_entities(|e| !e.is_item()));
        let mut tracker = tracker().with_dispatcher(bus);
        tracker
            .switch_to_phase(
                TrackingPhase::Tick,
                PhaseState::Tick(TickState::TickingEntity),
                PhaseContext::start().complete(),
            )
            .unwrap();
        tracker.process_spawn_entity(Entity::mob("pig", INSIDE), &cause()).unwrap();
        tracker.process_spawn_entity(Entity::item("pork", 1, INSIDE), &cause()).unwrap();
        tracker.complete_phase().unwrap();
        assert_eq!(tracker.world().entity_count(), 1);
    }

    #[test]
    fn vetoed_immediate_spawn_reports_false() {
        let mut bus = EventBus::new();
        bus.on_spawn_entity(|event| event.set_cancelled(true));
        let mut tracker = tracker().with_dispatcher(bus);
        assert!(!tracker.process_spawn_entity(Entity::mob("ghast", INSIDE), &cause()).unwrap());
        assert_eq!(tracker.world().entity_count(), 0);
    }

    #[test]
    fn spawn_cause_appends_notifier_then_creator() {
        let (a, b) = (ActorId::new(), ActorId::new());
        let entities = vec![
            Entity::mob("wolf", INSIDE).with_notifier(a).with_creator(b),
            Entity::mob("wolf", INSIDE).with_creator(a),
        ];
        let cause = spawn_cause(&cause(), &entities);
        let names: Vec<_> = cause.names().collect();
        assert_eq!(names, vec!["Source", "Notifier", "Creator", "Creator2"]);
    }
}
