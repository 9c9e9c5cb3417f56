//! Named causal participants and the ordered chain handed to listeners.

use std::fmt;

use phasetrack_common::{ActorId, BlockPos, BlockSnapshot, BlockType, EntitySnapshot};

use crate::error::TrackerError;

pub const SOURCE: &str = "Source";
pub const ADDITIONAL_SOURCE: &str = "AdditionalSource";
pub const PREVIOUS_SOURCE: &str = "PreviousSource";
/// The actor whose input packet started the current activity.
pub const PACKET_PLAYER: &str = "PacketPlayer";
pub const RESTORING_BLOCK: &str = "RestoringBlock";
pub const NOTIFIER: &str = "Notifier";
pub const CREATOR: &str = "Creator";

/// Identifies the plugin that requested a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginId(pub String);

/// A block with an attached tile entity, identified by where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileEntityRef {
    pub pos: BlockPos,
    pub block: BlockType,
}

/// Every kind of object that may take part in a cause.
#[derive(Debug, Clone, PartialEq)]
pub enum CauseValue {
    Block(BlockSnapshot),
    TileEntity(TileEntityRef),
    Entity(EntitySnapshot),
    Actor(ActorId),
    Plugin(PluginId),
    World(String),
}

impl CauseValue {
    /// Position of a block or tile entity participant.
    pub fn block_pos(&self) -> Option<BlockPos> {
        match self {
            Self::Block(snapshot) => Some(snapshot.pos),
            Self::TileEntity(tile) => Some(tile.pos),
            _ => None,
        }
    }

    pub fn is_plugin(&self) -> bool {
        matches!(self, Self::Plugin(_))
    }
}

impl fmt::Display for CauseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(snapshot) => write!(f, "block {snapshot}"),
            Self::TileEntity(tile) => write!(f, "tile entity {} at {}", tile.block, tile.pos),
            Self::Entity(entity) => write!(f, "entity {:?}", entity.kind),
            Self::Actor(actor) => write!(f, "{actor}"),
            Self::Plugin(plugin) => write!(f, "plugin {}", plugin.0),
            Self::World(name) => write!(f, "world {name}"),
        }
    }
}

impl From<BlockSnapshot> for CauseValue {
    fn from(value: BlockSnapshot) -> Self {
        Self::Block(value)
    }
}

impl From<TileEntityRef> for CauseValue {
    fn from(value: TileEntityRef) -> Self {
        Self::TileEntity(value)
    }
}

impl From<EntitySnapshot> for CauseValue {
    fn from(value: EntitySnapshot) -> Self {
        Self::Entity(value)
    }
}

impl From<ActorId> for CauseValue {
    fn from(value: ActorId) -> Self {
        Self::Actor(value)
    }
}

impl From<PluginId> for CauseValue {
    fn from(value: PluginId) -> Self {
        Self::Plugin(value)
    }
}

/// Typed access into a [`CauseValue`].
pub trait CauseObject {
    fn from_cause(value: &CauseValue) -> Option<&Self>;
}

macro_rules! cause_object {
    ($ty:ty, $variant:ident) => {
        impl CauseObject for $ty {
            fn from_cause(value: &CauseValue) -> Option<&Self> {
                match value {
                    CauseValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

cause_object!(BlockSnapshot, Block);
cause_object!(TileEntityRef, TileEntity);
cause_object!(EntitySnapshot, Entity);
cause_object!(ActorId, Actor);
cause_object!(PluginId, Plugin);

#[derive(Debug, Clone, PartialEq)]
pub struct NamedCause {
    pub name: String,
    pub value: CauseValue,
}

impl NamedCause {
    pub fn of(name: impl Into<String>, value: impl Into<CauseValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn source(value: impl Into<CauseValue>) -> Self {
        Self::of(SOURCE, value)
    }
}

/// An ordered, non-empty list of named participants. The first entry is
/// the root; names are unique within a cause.
#[derive(Debug, Clone, PartialEq)]
pub struct Cause {
    entries: Vec<NamedCause>,
}

impl Cause {
    /// Build a cause, suffixing any repeated names.
    pub fn of(entries: Vec<NamedCause>) -> Result<Self, TrackerError> {
        let mut iter = entries.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| TrackerError::precondition("a cause needs at least one participant"))?;
        let mut cause = Self {
            entries: vec![first],
        };
        for entry in iter {
            cause.append(entry.name, entry.value);
        }
        Ok(cause)
    }

    pub fn source(value: impl Into<CauseValue>) -> Self {
        Self {
            entries: vec![NamedCause::source(value)],
        }
    }

    pub fn root(&self) -> &NamedCause {
        &self.entries[0]
    }

    pub fn named_causes(&self) -> &[NamedCause] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&CauseValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The participant called `name`, if it has the requested type.
    pub fn first_named<T: CauseObject>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(T::from_cause)
    }

    /// The first participant of the requested type, in chain order.
    pub fn first<T: CauseObject>(&self) -> Option<&T> {
        self.entries.iter().find_map(|entry| T::from_cause(&entry.value))
    }

    /// Append a participant. A taken name gets the smallest free numeric
    /// suffix starting at 2; returns the name actually used.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<CauseValue>) -> String {
        let base = name.into();
        let name = self.free_name(&base);
        self.entries.push(NamedCause {
            name: name.clone(),
            value: value.into(),
        });
        name
    }

    fn free_name(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// A new chain rooted at `source`, with this chain's participants after
    /// it: `Source` becomes `AdditionalSource` and `AdditionalSource` becomes
    /// `PreviousSource`.
    pub fn chain(&self, source: impl Into<CauseValue>) -> Cause {
        let mut chained = Cause::source(source);
        for entry in &self.entries {
            let name = match entry.name.as_str() {
                SOURCE => ADDITIONAL_SOURCE,
                ADDITIONAL_SOURCE => PREVIOUS_SOURCE,
                other => other,
            };
            chained.append(name, entry.value.clone());
        }
        chained
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for entry in &self.entries {
            if !first {
                f.write_str(" <- ")?;
            }
            write!(f, "{}={}", entry.name, entry.value)?;
            first = false;
        }
        Ok(())
    }
}
