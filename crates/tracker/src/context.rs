use phasetrack_common::Entity;

use crate::capture::CaptureSupplier;
use crate::cause::{Cause, CauseObject, NamedCause};
use crate::error::TrackerError;
use crate::transaction::BlockTransaction;

/// The "why" of one phase plus the buffers for what it defers.
///
/// A context is built with [`PhaseContext::start`], filled with named causes,
/// sealed with [`PhaseContext::complete`] and then handed to the phase stack.
/// Causes cannot change once sealed; capture buffers can.
#[derive(Debug, Clone, Default)]
pub struct PhaseContext {
    causes: Vec<NamedCause>,
    blocks: CaptureSupplier<BlockTransaction>,
    entities: CaptureSupplier<Entity>,
    items: CaptureSupplier<Entity>,
    complete: bool,
}

impl PhaseContext {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn add(mut self, cause: NamedCause) -> Result<Self, TrackerError> {
        if self.complete {
            return Err(TrackerError::InvalidState(format!(
                "cannot add cause '{}' to a completed phase context",
                cause.name
            )));
        }
        self.causes.push(cause);
        Ok(self)
    }

    pub fn complete(mut self) -> Self {
        self.complete = true;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn named_causes(&self) -> &[NamedCause] {
        &self.causes
    }

    pub fn first_named<T: CauseObject>(&self, name: &str) -> Option<&T> {
        self.causes
            .iter()
            .filter(|cause| cause.name == name)
            .find_map(|cause| T::from_cause(&cause.value))
    }

    /// The context's causes as a chain, or `None` when it declared none.
    pub fn to_cause(&self) -> Option<Cause> {
        Cause::of(self.causes.clone()).ok()
    }

    pub fn captured_blocks(&self) -> &CaptureSupplier<BlockTransaction> {
        &self.blocks
    }

    pub fn captured_blocks_mut(&mut self) -> &mut CaptureSupplier<BlockTransaction> {
        &mut self.blocks
    }

    pub fn captured_entities(&self) -> &CaptureSupplier<Entity> {
        &self.entities
    }

    pub fn captured_entities_mut(&mut self) -> &mut CaptureSupplier<Entity> {
        &mut self.entities
    }

    pub fn captured_items(&self) -> &CaptureSupplier<Entity> {
        &self.items
    }

    pub fn captured_items_mut(&mut self) -> &mut CaptureSupplier<Entity> {
        &mut self.items
    }

    pub fn has_pending_captures(&self) -> bool {
        !(self.blocks.is_empty() && self.entities.is_empty() && self.items.is_empty())
    }

    pub fn pending_capture_count(&self) -> usize {
        self.blocks.len() + self.entities.len() + self.items.len()
    }

    pub(crate) fn sentinel() -> Self {
        Self::start().complete()
    }
}
