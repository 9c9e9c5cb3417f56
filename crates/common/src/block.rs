use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

use crate::{ActorId, BlockPos};

/// Numeric block type. Static properties come from [`BlockType::properties`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockType(pub u16);

/// Static, per-type block properties the tracker needs for derived updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockProperties {
    pub name: &'static str,
    pub light_opacity: u8,
    pub light_value: u8,
    pub has_tile_entity: bool,
    pub has_comparator_output: bool,
}

impl BlockProperties {
    const fn solid(name: &'static str) -> Self {
        Self {
            name,
            light_opacity: 255,
            light_value: 0,
            has_tile_entity: false,
            has_comparator_output: false,
        }
    }

    const fn clear(name: &'static str) -> Self {
        Self {
            name,
            light_opacity: 0,
            light_value: 0,
            has_tile_entity: false,
            has_comparator_output: false,
        }
    }
}

impl BlockType {
    pub const AIR: Self = Self(0);
    pub const STONE: Self = Self(1);
    pub const GRASS: Self = Self(2);
    pub const DIRT: Self = Self(3);
    pub const SAND: Self = Self(12);
    pub const GLASS: Self = Self(20);
    pub const TORCH: Self = Self(50);
    pub const CHEST: Self = Self(54);
    pub const REDSTONE_WIRE: Self = Self(55);
    pub const GLOWSTONE: Self = Self(89);
    pub const HOPPER: Self = Self(154);

    pub fn properties(self) -> BlockProperties {
        match self {
            Self::AIR => BlockProperties::clear("air"),
            Self::STONE => BlockProperties::solid("stone"),
            Self::GRASS => BlockProperties::solid("grass"),
            Self::DIRT => BlockProperties::solid("dirt"),
            Self::SAND => BlockProperties::solid("sand"),
            Self::GLASS => BlockProperties::clear("glass"),
            Self::TORCH => BlockProperties {
                light_value: 14,
                ..BlockProperties::clear("torch")
            },
            Self::CHEST => BlockProperties {
                has_tile_entity: true,
                has_comparator_output: true,
                ..BlockProperties::clear("chest")
            },
            Self::REDSTONE_WIRE => BlockProperties::clear("redstone_wire"),
            Self::GLOWSTONE => BlockProperties {
                light_value: 15,
                ..BlockProperties::solid("glowstone")
            },
            Self::HOPPER => BlockProperties {
                has_tile_entity: true,
                has_comparator_output: true,
                ..BlockProperties::clear("hopper")
            },
            _ => BlockProperties::solid("unknown"),
        }
    }

    pub fn name(self) -> &'static str {
        self.properties().name
    }

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID #{} ({})", self.0, self.name())
    }
}

/// A block type plus its variant bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    pub block: BlockType,
    pub meta: u8,
}

impl BlockState {
    pub const AIR: Self = Self::of(BlockType::AIR);

    pub const fn of(block: BlockType) -> Self {
        Self { block, meta: 0 }
    }

    pub const fn with_meta(block: BlockType, meta: u8) -> Self {
        Self { block, meta }
    }
}

impl Default for BlockState {
    fn default() -> Self {
        Self::AIR
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[meta={}]", self.block.name(), self.meta)
    }
}

/// Update-intent bitmask passed along with a block change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateFlags(pub u8);

impl UpdateFlags {
    pub const NONE: Self = Self(0);
    pub const NEIGHBOR_NOTIFY: Self = Self(1);
    pub const RENDER_UPDATE: Self = Self(2);
    pub const SUPPRESS_RENDER: Self = Self(4);
    pub const OBSERVER_NOTIFY: Self = Self(8);
    pub const DEFAULT: Self = Self(1 | 2);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn notifies_neighbors(self) -> bool {
        self.contains(Self::NEIGHBOR_NOTIFY)
    }

    pub fn updates_render(self) -> bool {
        self.contains(Self::RENDER_UPDATE)
    }

    pub fn suppresses_render(self) -> bool {
        self.contains(Self::SUPPRESS_RENDER)
    }

    pub fn notifies_observers(self) -> bool {
        self.contains(Self::OBSERVER_NOTIFY)
    }
}

impl Default for UpdateFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for UpdateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Immutable record of a block at a position, as seen at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub pos: BlockPos,
    pub state: BlockState,
    /// State after neighbour-dependent adjustments (connections, facing).
    pub extended_state: BlockState,
    pub update_flags: UpdateFlags,
    pub creator: Option<ActorId>,
    pub notifier: Option<ActorId>,
}

impl BlockSnapshot {
    pub fn new(pos: BlockPos, state: BlockState, update_flags: UpdateFlags) -> Self {
        Self {
            pos,
            state,
            extended_state: state,
            update_flags,
            creator: None,
            notifier: None,
        }
    }

    pub fn with_extended_state(mut self, extended_state: BlockState) -> Self {
        self.extended_state = extended_state;
        self
    }

    pub fn with_attribution(mut self, creator: Option<ActorId>, notifier: Option<ActorId>) -> Self {
        self.creator = creator;
        self.notifier = notifier;
        self
    }

    pub fn block(&self) -> BlockType {
        self.state.block
    }
}

impl fmt::Display for BlockSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.state, self.pos)
    }
}
