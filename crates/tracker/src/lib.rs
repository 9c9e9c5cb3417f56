//! Cause tracking for a simulated world.
//!
//! Every mutation (block change, neighbour notification, entity spawn) goes
//! through a [`CauseTracker`], which consults a stack of nested phases to
//! decide whether to apply it now or capture it. Captured mutations are
//! announced to listeners and committed when their phase completes, each
//! carrying the [`Cause`] chain that explains it.
//!
//! # Invariants
//! - The idle sentinel is always at the bottom of the stack and is never
//!   popped.
//! - A context must be completed before it is pushed.
//! - Phases complete in LIFO order; every push has exactly one pop.
//! - Captured mutations are drained exactly once, during unwind.

pub mod behavior;
pub mod capture;
pub mod cause;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod phase;
pub mod proxy;
pub mod stack;
pub mod tracker;
pub mod transaction;

pub use behavior::{BehaviorRegistry, BlockBehavior, ConnectingBlock, SupportedBlock};
pub use capture::{CaptureSupplier, CaptureType};
pub use cause::{Cause, CauseObject, CauseValue, NamedCause, PluginId, TileEntityRef};
pub use config::{ConfigError, TrackerConfig, TransitionPolicy};
pub use context::PhaseContext;
pub use diagnostics::{CrashReport, PrettyPrinter, ReportSection};
pub use error::TrackerError;
pub use event::{
    ChangeBlockEvent, ConstructEntityEvent, EventBus, EventDispatcher, NoopDispatcher, SpawnEntityEvent,
    SpawnEventKind,
};
pub use phase::{
    BlockPhaseState, GeneralState, PhaseState, PlayerState, SpawningState, TickState, TrackingPhase,
    WorldGenState,
};
pub use proxy::{ProxyBlockAccess, ProxyView};
pub use stack::{PhaseData, PhaseStack};
pub use tracker::{BlockReplay, CauseTracker};
pub use transaction::BlockTransaction;
