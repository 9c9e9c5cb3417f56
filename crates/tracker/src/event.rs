//! Outbound notifications. Listeners see proposed changes before they
//! reach the world and may veto or rewrite them.

use phasetrack_common::{Entity, EntitySnapshot};

use crate::capture::CaptureType;
use crate::cause::Cause;
use crate::transaction::BlockTransaction;

/// Which flavour of spawn event a phase state fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnEventKind {
    Spawn,
    ChunkLoad,
    DropItem,
}

/// Fired once for an entity that has just finished construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructEntityEvent {
    pub entity: EntitySnapshot,
    pub world: String,
}

/// A run of same-type block transactions about to be committed.
#[derive(Debug)]
pub struct ChangeBlockEvent {
    kind: CaptureType,
    cause: Cause,
    world: String,
    transactions: Vec<BlockTransaction>,
    cancelled: bool,
}

impl ChangeBlockEvent {
    pub fn new(kind: CaptureType, cause: Cause, world: String, transactions: Vec<BlockTransaction>) -> Self {
        Self {
            kind,
            cause,
            world,
            transactions,
            cancelled: false,
        }
    }

    pub fn kind(&self) -> CaptureType {
        self.kind
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn transactions(&self) -> &[BlockTransaction] {
        &self.transactions
    }

    pub fn transactions_mut(&mut self) -> &mut [BlockTransaction] {
        &mut self.transactions
    }

    /// Invalidate every transaction the predicate rejects.
    pub fn filter(&mut self, mut keep: impl FnMut(&BlockTransaction) -> bool) {
        for tx in &mut self.transactions {
            if !keep(tx) {
                tx.set_valid(false);
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    pub fn into_parts(self) -> (Vec<BlockTransaction>, Cause, bool) {
        (self.transactions, self.cause, self.cancelled)
    }
}

/// Entities about to be added to the world.
#[derive(Debug)]
pub struct SpawnEntityEvent {
    kind: SpawnEventKind,
    cause: Cause,
    world: String,
    entities: Vec<Entity>,
    snapshots: Vec<EntitySnapshot>,
    cancelled: bool,
}

impl SpawnEntityEvent {
    pub fn new(kind: SpawnEventKind, cause: Cause, world: String, entities: Vec<Entity>) -> Self {
        let snapshots = entities.iter().map(Entity::snapshot).collect();
        Self {
            kind,
            cause,
            world,
            entities,
            snapshots,
            cancelled: false,
        }
    }

    pub fn kind(&self) -> SpawnEventKind {
        self.kind
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Snapshots of the entities as originally proposed, unaffected by
    /// filtering.
    pub fn snapshots(&self) -> &[EntitySnapshot] {
        &self.snapshots
    }

    pub fn filter_entities(&mut self, keep: impl FnMut(&Entity) -> bool) {
        self.entities.retain(keep);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    pub fn into_entities(self) -> Vec<Entity> {
        if self.cancelled {
            Vec::new()
        } else {
            self.entities
        }
    }
}

/// Receives tracker notifications. Every method defaults to letting the
/// change through untouched.
pub trait EventDispatcher {
    fn construct_entity_post(&mut self, _event: &ConstructEntityEvent) {}

    fn change_block(&mut self, _event: &mut ChangeBlockEvent) {}

    fn spawn_entity(&mut self, _event: &mut SpawnEntityEvent) {}
}

/// Dispatcher that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl EventDispatcher for NoopDispatcher {}

type Listener<E> = Box<dyn FnMut(&mut E)>;

/// Stock dispatcher: listeners run in registration order and all of them
/// see the event, including after an earlier one cancelled it.
#[derive(Default)]
pub struct EventBus {
    construct: Vec<Box<dyn FnMut(&ConstructEntityEvent)>>,
    change_block: Vec<Listener<ChangeBlockEvent>>,
    spawn_entity: Vec<Listener<SpawnEntityEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_construct(&mut self, listener: impl FnMut(&ConstructEntityEvent) + 'static) -> &mut Self {
        self.construct.push(Box::new(listener));
        self
    }

    pub fn on_change_block(&mut self, listener: impl FnMut(&mut ChangeBlockEvent) + 'static) -> &mut Self {
        self.change_block.push(Box::new(listener));
        self
    }

    pub fn on_spawn_entity(&mut self, listener: impl FnMut(&mut SpawnEntityEvent) + 'static) -> &mut Self {
        self.spawn_entity.push(Box::new(listener));
        self
    }

    pub fn listener_count(&self) -> usize {
        self.construct.len() + self.change_block.len() + self.spawn_entity.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("construct", &self.construct.len())
            .field("change_block", &self.change_block.len())
            .field("spawn_entity", &self.spawn_entity.len())
            .finish()
    }
}

impl EventDispatcher for EventBus {
    fn construct_entity_post(&mut self, event: &ConstructEntityEvent) {
        for listener in &mut self.construct {
            listener(event);
        }
    }

    fn change_block(&mut self, event: &mut ChangeBlockEvent) {
        for listener in &mut self.change_block {
            listener(event);
        }
    }

    fn spawn_entity(&mut self, event: &mut SpawnEntityEvent) {
        for listener in &mut self.spawn_entity {
            listener(event);
        }
    }
}
