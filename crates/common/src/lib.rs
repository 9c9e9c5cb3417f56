//! Shared value types for the phase tracking workspace.
//!
//! Everything here is plain data: positions, identifiers, block states and the
//! snapshots that phases capture. No type in this crate touches a world.

mod block;
mod entity;
mod types;

pub use block::{BlockProperties, BlockSnapshot, BlockState, BlockType, UpdateFlags};
pub use entity::{Entity, EntityKind, EntitySnapshot, TrackerKind};
pub use types::{ActorId, BlockPos, ChunkPos, Direction, EntityId};
