//! Developer tooling: read-only inspectors for worlds and cause trackers.
//!
//! # Invariants
//! - Inspectors never mutate what they inspect.

pub mod inspector;

pub use inspector::{EntityInfo, TrackerInspector, TrackerSummary, WorldInspector, WorldSummary};
