use phasetrack_common::{EntityId, EntityKind};
use phasetrack_kernel::{World, WorldHost};
use phasetrack_tracker::{CauseTracker, PhaseState};

/// World inspector for developer tooling.
///
/// Provides read-only queries against the reference world for debugging
/// and demo output.
pub struct WorldInspector;

impl WorldInspector {
    /// Produce a summary of the world state.
    pub fn summary(world: &World) -> WorldSummary {
        WorldSummary {
            name: world.name().to_string(),
            chunks: world.chunk_count(),
            blocks: world.block_count(),
            entity_count: world.entity_count(),
            actors: world.actors().len(),
            pending_events: world.events().len(),
        }
    }

    pub fn inspect_entity(world: &World, id: EntityId) -> Option<EntityInfo> {
        world.entity(id).map(|entity| {
            let p = entity.position;
            EntityInfo {
                id,
                kind: describe_kind(&entity.kind),
                position: [p.x, p.y, p.z],
                creator: entity.creator.map(|a| a.to_string()),
                notifier: entity.notifier.map(|a| a.to_string()),
            }
        })
    }

    /// Entity ids in spawn order.
    pub fn list_entities(world: &World) -> Vec<EntityId> {
        world.loaded_entities().to_vec()
    }
}

fn describe_kind(kind: &EntityKind) -> String {
    match kind {
        EntityKind::Player(actor) => format!("player {actor}"),
        EntityKind::Item { item, count } => format!("item {item} x{count}"),
        EntityKind::LightningBolt => "lightning".to_string(),
        EntityKind::Mob(name) => name.clone(),
    }
}

/// Summary of world state for the inspector.
#[derive(Debug, Clone)]
pub struct WorldSummary {
    pub name: String,
    pub chunks: usize,
    pub blocks: usize,
    pub entity_count: usize,
    pub actors: usize,
    pub pending_events: usize,
}

impl std::fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "World '{}': chunks={} blocks={} entities={} actors={} pending_events={}",
            self.name, self.chunks, self.blocks, self.entity_count, self.actors, self.pending_events
        )
    }
}

/// Detailed info about a single entity.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub id: EntityId,
    pub kind: String,
    pub position: [f64; 3],
    pub creator: Option<String>,
    pub notifier: Option<String>,
}

impl std::fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entity [{:.8}] {} pos=({:.2}, {:.2}, {:.2})",
            &self.id.0.to_string()[..8],
            self.kind,
            self.position[0],
            self.position[1],
            self.position[2],
        )?;
        if let Some(creator) = &self.creator {
            write!(f, " creator={creator}")?;
        }
        if let Some(notifier) = &self.notifier {
            write!(f, " notifier={notifier}")?;
        }
        Ok(())
    }
}

/// Read-only view of a tracker's phase stack.
pub struct TrackerInspector;

impl TrackerInspector {
    pub fn summary<W: WorldHost>(tracker: &CauseTracker<W>) -> TrackerSummary {
        let phases = tracker.phases();
        TrackerSummary {
            world: tracker.world().name().to_string(),
            depth: phases.depth(),
            states: phases.current_states(),
            pending_captures: phases
                .frames()
                .iter()
                .map(|frame| frame.context.pending_capture_count())
                .sum(),
            capturing_blocks: tracker.is_capturing_blocks(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerSummary {
    pub world: String,
    pub depth: usize,
    /// Bottom to top, sentinel first.
    pub states: Vec<PhaseState>,
    pub pending_captures: usize,
    pub capturing_blocks: bool,
}

impl std::fmt::Display for TrackerSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states: Vec<String> = self.states.iter().map(ToString::to_string).collect();
        write!(
            f,
            "Tracker '{}': depth={} pending_captures={} capturing_blocks={} stack=[{}]",
            self.world,
            self.depth,
            self.pending_captures,
            self.capturing_blocks,
            states.join(" > ")
        )
    }
}
