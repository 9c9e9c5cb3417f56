use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a player or other user that can be blamed for a change.
///
/// Actors outlive the entities that represent them, so attribution is keyed by
/// this id rather than by [`EntityId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor:{:.8}", self.0.to_string())
    }
}

/// Integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The adjacent position one step towards `direction`.
    pub fn offset(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.delta();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Centre of the block in world space.
    pub fn center(self) -> DVec3 {
        DVec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    /// Chunk column containing this block.
    pub fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }

    /// Block containing the given continuous position.
    pub fn containing(position: DVec3) -> Self {
        Self::new(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        )
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A 16x16 column of blocks, addressed in chunk units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk column containing a continuous (entity) position.
    pub fn containing(position: DVec3) -> Self {
        Self::new(
            (position.x / 16.0).floor() as i32,
            (position.z / 16.0).floor() as i32,
        )
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// The six axis-aligned neighbours of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    West,
    East,
    Down,
    Up,
    North,
    South,
}

impl Direction {
    /// Neighbour notification order.
    pub const NOTIFY_ORDER: [Direction; 6] = [
        Direction::West,
        Direction::East,
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
    ];

    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn block_to_chunk_handles_negative_coordinates() {
        assert_eq!(BlockPos::new(15, 64, 15).chunk(), ChunkPos::new(0, 0));
        assert_eq!(BlockPos::new(16, 64, -1).chunk(), ChunkPos::new(1, -1));
        assert_eq!(BlockPos::new(-17, 0, -16).chunk(), ChunkPos::new(-2, -1));
    }

    #[test]
    fn entity_position_to_chunk_floors() {
        assert_eq!(ChunkPos::containing(DVec3::new(-0.5, 70.0, 31.9)), ChunkPos::new(-1, 1));
        assert_eq!(BlockPos::containing(DVec3::new(-0.5, 70.2, 31.9)), BlockPos::new(-1, 70, 31));
    }

    #[test]
    fn neighbours_are_distinct_and_adjacent() {
        let origin = BlockPos::new(0, 64, 0);
        let neighbours: Vec<BlockPos> = Direction::NOTIFY_ORDER
            .iter()
            .map(|d| origin.offset(*d))
            .collect();
        assert_eq!(neighbours[0], BlockPos::new(-1, 64, 0));
        assert_eq!(neighbours[3], BlockPos::new(0, 65, 0));
        for n in &neighbours {
            let dist = (n.x - origin.x).abs() + (n.y - origin.y).abs() + (n.z - origin.z).abs();
            assert_eq!(dist, 1);
        }
    }
}
