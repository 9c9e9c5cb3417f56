use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{ActorId, ChunkPos, EntityId};

/// Which per-position attribution a record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackerKind {
    /// The actor that placed the block or spawned the entity.
    Creator,
    /// The actor that most recently caused an update to reach it.
    Notifier,
}

/// Coarse entity classification. Only the kinds the tracker treats
/// differently get their own variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A player; never captured, always spawned.
    Player(ActorId),
    /// A dropped item stack.
    Item { item: String, count: u8 },
    LightningBolt,
    Mob(String),
}

/// An entity that has been constructed but not necessarily spawned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: DVec3,
    /// Spawn even into unloaded chunks.
    pub force_spawn: bool,
    /// Post-construction notifications have not been fired yet.
    pub in_construct_phase: bool,
    pub creator: Option<ActorId>,
    pub notifier: Option<ActorId>,
}

impl Entity {
    pub fn new(kind: EntityKind, position: DVec3) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            position,
            force_spawn: false,
            in_construct_phase: false,
            creator: None,
            notifier: None,
        }
    }

    pub fn mob(name: &str, position: DVec3) -> Self {
        Self::new(EntityKind::Mob(name.to_string()), position)
    }

    pub fn item(item: &str, count: u8, position: DVec3) -> Self {
        Self::new(
            EntityKind::Item {
                item: item.to_string(),
                count,
            },
            position,
        )
    }

    pub fn player(actor: ActorId, position: DVec3) -> Self {
        Self::new(EntityKind::Player(actor), position)
    }

    pub fn forced(mut self) -> Self {
        self.force_spawn = true;
        self
    }

    pub fn constructing(mut self) -> Self {
        self.in_construct_phase = true;
        self
    }

    pub fn with_creator(mut self, creator: ActorId) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn with_notifier(mut self, notifier: ActorId) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn is_item(&self) -> bool {
        matches!(self.kind, EntityKind::Item { .. })
    }

    /// The actor this entity embodies, if it is a player.
    pub fn actor(&self) -> Option<ActorId> {
        match self.kind {
            EntityKind::Player(actor) => Some(actor),
            _ => None,
        }
    }

    pub fn chunk(&self) -> ChunkPos {
        ChunkPos::containing(self.position)
    }

    pub fn tracked(&self, kind: TrackerKind) -> Option<ActorId> {
        match kind {
            TrackerKind::Creator => self.creator,
            TrackerKind::Notifier => self.notifier,
        }
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind.clone(),
            position: self.position,
            creator: self.creator,
            notifier: self.notifier,
        }
    }
}

/// Read-only copy of an entity handed to listeners alongside the live list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: DVec3,
    pub creator: Option<ActorId>,
    pub notifier: Option<ActorId>,
}
