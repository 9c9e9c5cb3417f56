//! World Kernel: the simulation boundary the cause tracker drives, and an
//! in-memory world implementing it.
//!
//! # Invariants
//! - Every raw mutation is appended to the world's event log.
//! - Attribution reads and writes against unloaded chunks are no-ops.

pub mod chunk;
pub mod host;
pub mod world;

pub use chunk::Chunk;
pub use host::{BlockView, WorldHost};
pub use world::World;

use phasetrack_common::{ActorId, BlockPos, BlockState, BlockType, ChunkPos, EntityId, TrackerKind};
use serde::{Deserialize, Serialize};

/// A record produced by every raw mutation applied to the world.
///
/// The log is what tests and tools inspect to see exactly which writes reached
/// the live world, and in which order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEvent {
    ChunkLoaded { chunk: ChunkPos, populated: bool },
    ChunkUnloaded { chunk: ChunkPos },
    /// A block state was written.
    BlockChanged {
        pos: BlockPos,
        old: BlockState,
        new: BlockState,
    },
    LightChecked { pos: BlockPos },
    /// Clients were told to re-render a block.
    BlockMarkedForUpdate { pos: BlockPos },
    ComparatorUpdated { pos: BlockPos, block: BlockType },
    EntityAdded { id: EntityId, chunk: ChunkPos },
    EntityRemoved { id: EntityId, chunk: ChunkPos },
    ActorJoined { actor: ActorId, entity: EntityId },
    SleepingFlagUpdated { all_sleeping: bool },
    AttributionTracked {
        pos: BlockPos,
        actor: ActorId,
        kind: TrackerKind,
    },
}
