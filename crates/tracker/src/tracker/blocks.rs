use phasetrack_common::{
    ActorId, BlockPos, BlockSnapshot, BlockState, BlockType, Direction, EntitySnapshot, TrackerKind,
    UpdateFlags,
};
use phasetrack_kernel::WorldHost;

use super::CauseTracker;
use crate::capture::CaptureType;
use crate::cause::{Cause, NamedCause, PluginId, TileEntityRef, PACKET_PLAYER, RESTORING_BLOCK, SOURCE};
use crate::context::PhaseContext;
use crate::diagnostics::CrashReport;
use crate::error::TrackerError;
use crate::event::ChangeBlockEvent;
use crate::phase::{BlockPhaseState, PhaseState};
use crate::proxy::ProxyBlockAccess;
use crate::transaction::BlockTransaction;

/// Outcome of replaying a batch of block transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReplay {
    /// Transactions committed to the world.
    pub applied: usize,
    /// The cause after any chaining done by block-added hooks.
    pub cause: Cause,
}

impl<W: WorldHost> CauseTracker<W> {
    pub fn is_capturing_blocks(&self) -> bool {
        !self.phases.is_idle()
            && (self.capture_blocks || self.phases.peek_state().requires_block_capturing())
    }

    /// The block at `pos` as the active phase sees it: pending captures of
    /// every frame from the top down, then the world.
    pub fn get_block_state(&self, pos: BlockPos) -> Option<BlockState> {
        if self.is_capturing_blocks() {
            let pending = self
                .phases
                .frames()
                .iter()
                .rev()
                .flat_map(|frame| frame.context.captured_blocks().iter().rev())
                .find(|tx| tx.is_valid() && tx.pos() == pos);
            if let Some(tx) = pending {
                return Some(tx.final_snapshot().state);
            }
        }
        self.world.block_state(pos)
    }

    /// Change a block, either now or at the end of the active phase.
    ///
    /// Returns whether the change was accepted: `false` when the chunk is not
    /// loaded or the block already has that state.
    pub fn set_block_state(
        &mut self,
        pos: BlockPos,
        state: BlockState,
        flags: UpdateFlags,
    ) -> Result<bool, TrackerError> {
        if self.is_capturing_blocks() {
            return Ok(self.capture_block_change(pos, state, flags));
        }
        self.apply_block_state(pos, state, flags)
    }

    fn capture_block_change(&mut self, pos: BlockPos, state: BlockState, flags: UpdateFlags) -> bool {
        let Some(original) = self.get_block_state(pos) else {
            return false;
        };
        if original == state {
            return false;
        }
        let creator = self.world.tracked_actor(pos, TrackerKind::Creator);
        let notifier = self.world.tracked_actor(pos, TrackerKind::Notifier);
        let current = self.phases.peek_state();
        let actor = self
            .phases
            .peek_context()
            .first_named::<ActorId>(PACKET_PLAYER)
            .copied();
        let placing = original.block.is_air() && !state.block.is_air();
        let (new_creator, new_notifier) = match actor {
            Some(actor) if placing => (Some(actor), None),
            Some(actor) => (creator, Some(actor)),
            None => (creator, notifier),
        };

        let kind = CaptureType::classify(original, state, current.is_decaying());
        let transaction = BlockTransaction::new(
            BlockSnapshot::new(pos, original, flags).with_attribution(creator, notifier),
            BlockSnapshot::new(pos, state, flags).with_attribution(new_creator, new_notifier),
            kind,
        );
        tracing::trace!(%pos, %original, %state, %kind, phase = %current, "block change captured");
        self.supersede_ancestor_captures(pos);
        self.phases
            .peek_context_mut()
            .captured_blocks_mut()
            .record(transaction);
        true
    }

    /// Revoke pending changes to `pos` held by frames below the top. Those
    /// frames unwind later and would otherwise overwrite the newer change.
    fn supersede_ancestor_captures(&mut self, pos: BlockPos) {
        let frames = self.phases.frames_mut();
        let Some((_, ancestors)) = frames.split_last_mut() else {
            return;
        };
        for frame in ancestors {
            for tx in frame.context.captured_blocks_mut().iter_mut() {
                if tx.is_valid() && tx.pos() == pos {
                    tx.set_valid(false);
                    tracing::trace!(%pos, phase = %frame.state, "pending change superseded");
                }
            }
        }
    }

    /// Write a block straight into the world and run the derived updates the
    /// flags ask for.
    pub fn apply_block_state(
        &mut self,
        pos: BlockPos,
        state: BlockState,
        flags: UpdateFlags,
    ) -> Result<bool, TrackerError> {
        let Some(old) = self.world.set_block_state_raw(pos, state) else {
            return Ok(false);
        };
        self.check_light_if_changed(pos, old.block, state.block);
        self.mark_and_notify_neighbors(pos, old, state, flags)?;
        Ok(true)
    }

    fn check_light_if_changed(&mut self, pos: BlockPos, old: BlockType, new: BlockType) {
        let (old, new) = (old.properties(), new.properties());
        if old.light_opacity != new.light_opacity || old.light_value != new.light_value {
            self.world.check_light(pos);
        }
    }

    fn mark_and_notify_neighbors(
        &mut self,
        pos: BlockPos,
        old: BlockState,
        new: BlockState,
        flags: UpdateFlags,
    ) -> Result<(), TrackerError> {
        let remote = self.world.is_remote();
        if flags.updates_render()
            && (!remote || !flags.suppresses_render())
            && self.world.is_chunk_populated(pos.chunk())
        {
            self.world.mark_block_for_update(pos);
        }
        if !remote && flags.notifies_neighbors() {
            self.notify_neighbors(pos, old.block)?;
            if new.block.properties().has_comparator_output {
                self.world.update_comparator_output_level(pos, new.block);
            }
        }
        Ok(())
    }

    /// Notify the six neighbours of `pos` that `block` changed, in west,
    /// east, down, up, north, south order.
    pub fn notify_neighbors(&mut self, pos: BlockPos, block: BlockType) -> Result<(), TrackerError> {
        for direction in Direction::NOTIFY_ORDER {
            self.notify_block_of_state_change(pos.offset(direction), block, pos)?;
        }
        Ok(())
    }

    /// Tell the block at `notify_pos` that its neighbour at `source_pos`
    /// (formerly `source_block`) changed, recording who is responsible.
    pub fn notify_block_of_state_change(
        &mut self,
        notify_pos: BlockPos,
        source_block: BlockType,
        source_pos: BlockPos,
    ) -> Result<(), TrackerError> {
        if self.world.is_remote() {
            return Ok(());
        }
        let Some(state) = self.world.block_state(notify_pos) else {
            return Ok(());
        };
        self.track_notification(notify_pos, state.block);

        let Some(behavior) = self.behaviors.get(state.block) else {
            return Ok(());
        };
        behavior
            .on_neighbor_changed(self, notify_pos, state, source_block)
            .map_err(|err| self.neighbour_failure(err, notify_pos, state, source_block, source_pos))
    }

    fn track_notification(&mut self, notify_pos: BlockPos, block: BlockType) {
        let context = self.phases.peek_context();
        if let Some(actor) = context.first_named::<ActorId>(PACKET_PLAYER).copied() {
            self.world
                .add_tracked_block_position(block, notify_pos, actor, TrackerKind::Notifier);
            return;
        }
        let source_pos = if let Some(snapshot) = context.first_named::<BlockSnapshot>(SOURCE) {
            Some((snapshot.pos, snapshot.notifier.or(snapshot.creator)))
        } else if let Some(tile) = context.first_named::<TileEntityRef>(SOURCE) {
            Some((tile.pos, None))
        } else if let Some(entity) = context.first_named::<EntitySnapshot>(SOURCE) {
            if let Some(actor) = entity.notifier.or(entity.creator) {
                self.world
                    .add_tracked_block_position(block, notify_pos, actor, TrackerKind::Notifier);
            }
            None
        } else {
            None
        };
        if let Some((source_pos, fallback)) = source_pos {
            self.try_to_track_block(source_pos, fallback, block, notify_pos);
        }
    }

    /// Pass the source position's attribution on to `notify_pos`.
    fn try_to_track_block(
        &mut self,
        source_pos: BlockPos,
        fallback: Option<ActorId>,
        block: BlockType,
        notify_pos: BlockPos,
    ) {
        let actor = self
            .world
            .tracked_actor(source_pos, TrackerKind::Notifier)
            .or_else(|| self.world.tracked_actor(source_pos, TrackerKind::Creator))
            .or(fallback);
        if let Some(actor) = actor {
            self.world
                .add_tracked_block_position(block, notify_pos, actor, TrackerKind::Notifier);
        }
    }

    fn neighbour_failure(
        &self,
        err: TrackerError,
        notify_pos: BlockPos,
        state: BlockState,
        source_block: BlockType,
        source_pos: BlockPos,
    ) -> TrackerError {
        let phases = self
            .phases
            .current_states()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let mut report = CrashReport::new("Exception while updating neighbours", err);
        report
            .section("Block being updated")
            .detail("Source block type", source_block)
            .detail("Source block location", source_pos)
            .detail("Block location", notify_pos)
            .detail("Block", state);
        report
            .section("Cause tracking")
            .detail("World", self.world.name())
            .detail("Phases", phases);
        tracing::error!(%notify_pos, %source_block, "neighbour update failed");
        TrackerError::Reported(Box::new(report))
    }

    /// Drain one frame's captured block changes: one change-block event per
    /// run of same-type transactions, then replay the survivors.
    pub(crate) fn process_block_captures(
        &mut self,
        state: PhaseState,
        transactions: Vec<BlockTransaction>,
        cause: &Cause,
    ) -> Result<(), TrackerError> {
        let transactions: Vec<_> = transactions.into_iter().filter(BlockTransaction::is_valid).collect();
        for (kind, run) in split_runs(transactions) {
            let mut event = ChangeBlockEvent::new(kind, cause.clone(), self.world_name(), run);
            self.events.change_block(&mut event);
            let (transactions, _, cancelled) = event.into_parts();
            if cancelled {
                tracing::debug!(%state, %kind, count = transactions.len(), "block changes cancelled");
                continue;
            }
            self.mark_and_notify_block_post(transactions, Some(kind), cause.clone())?;
        }
        Ok(())
    }

    /// Commit a batch of transactions in order, firing block-added hooks and
    /// neighbour notifications against a view where earlier transactions in
    /// the batch have already happened.
    pub fn mark_and_notify_block_post(
        &mut self,
        transactions: Vec<BlockTransaction>,
        capture_type: Option<CaptureType>,
        cause: Cause,
    ) -> Result<BlockReplay, TrackerError> {
        let mut proxy = ProxyBlockAccess::new(&transactions);
        let mut cause = cause;
        let mut applied = 0;
        for transaction in &transactions {
            if !transaction.is_valid() {
                continue;
            }
            let pos = transaction.pos();
            let flags = transaction.update_flags();
            let original = transaction.original().state;
            let replacement = transaction.final_snapshot();

            if transaction.custom().is_some() {
                let context = PhaseContext::start()
                    .add(NamedCause::of(RESTORING_BLOCK, replacement.clone()))?
                    .complete();
                self.phases
                    .push_replay(PhaseState::Block(BlockPhaseState::RestoringBlocks), context)?;
                let restored = self.restore_block_snapshot(replacement, true, false);
                self.complete_phase()?;
                restored?;
            } else {
                self.commit(replacement, original.block);
            }
            self.log_block_action(&cause, capture_type, transaction);

            if !replacement.block().properties().has_tile_entity {
                let chain = self.should_chain_cause(&cause);
                let extended = self.actual_state(replacement.state, &proxy, pos);
                let source = BlockSnapshot::new(pos, replacement.state, flags)
                    .with_extended_state(extended)
                    .with_attribution(replacement.creator, replacement.notifier);
                let context = PhaseContext::start()
                    .add(NamedCause::source(source.clone()))?
                    .complete();
                self.phases
                    .push_replay(PhaseState::Block(BlockPhaseState::PostNotificationEvent), context)?;
                let added = self.fire_block_added(pos, replacement.state);
                if chain {
                    cause = cause.chain(source);
                }
                self.complete_phase()?;
                added?;
            }

            proxy.proceed();
            self.mark_and_notify_neighbors(pos, original, replacement.state, flags)?;
            applied += 1;

            let pending = self.phases.peek_context().pending_capture_count();
            if pending > 0 {
                tracing::trace!(%pos, pending, phase = %self.phases.peek_state(), "captures queued during notification");
            }
        }
        Ok(BlockReplay { applied, cause })
    }

    fn commit(&mut self, snapshot: &BlockSnapshot, old: BlockType) {
        if self.world.set_block_state_raw(snapshot.pos, snapshot.state).is_some() {
            self.check_light_if_changed(snapshot.pos, old, snapshot.block());
        }
        self.track_snapshot(snapshot);
    }

    fn track_snapshot(&mut self, snapshot: &BlockSnapshot) {
        let block = snapshot.block();
        if let Some(creator) = snapshot.creator {
            self.world
                .add_tracked_block_position(block, snapshot.pos, creator, TrackerKind::Creator);
        }
        if let Some(notifier) = snapshot.notifier {
            self.world
                .add_tracked_block_position(block, snapshot.pos, notifier, TrackerKind::Notifier);
        }
    }

    fn log_block_action(&self, cause: &Cause, capture_type: Option<CaptureType>, transaction: &BlockTransaction) {
        if !self.config.log_block_actions {
            return;
        }
        tracing::debug!(
            target: "phasetrack::blocks",
            world = self.world.name(),
            kind = ?capture_type,
            pos = %transaction.pos(),
            original = %transaction.original().state,
            replacement = %transaction.final_snapshot().state,
            custom = transaction.custom().is_some(),
            cause = %cause.root().name,
            "block action"
        );
    }

    /// Chaining stops at plugins: a plugin-sourced cause stays as the
    /// plugin declared it.
    fn should_chain_cause(&self, cause: &Cause) -> bool {
        let plugin_context = self
            .phases
            .peek_context()
            .first_named::<PluginId>(SOURCE)
            .is_some();
        !plugin_context && !cause.root().value.is_plugin()
    }

    fn actual_state(&self, state: BlockState, proxy: &ProxyBlockAccess, pos: BlockPos) -> BlockState {
        match self.behaviors.get(state.block) {
            Some(behavior) => behavior.actual_state(state, &proxy.view(&self.world), pos),
            None => state,
        }
    }

    fn fire_block_added(&mut self, pos: BlockPos, state: BlockState) -> Result<(), TrackerError> {
        match self.behaviors.get(state.block) {
            Some(behavior) => behavior.on_block_added(self, pos, state),
            None => Ok(()),
        }
    }

    /// Put a snapshot back into the world.
    ///
    /// Without `force` the live block must still be of the snapshot's type.
    /// With `notify` the write uses the default flags, otherwise it only
    /// updates rendering.
    pub fn restore_block_snapshot(
        &mut self,
        snapshot: &BlockSnapshot,
        force: bool,
        notify: bool,
    ) -> Result<bool, TrackerError> {
        let Some(current) = self.world.block_state(snapshot.pos) else {
            return Ok(false);
        };
        if !force && current.block != snapshot.block() {
            return Ok(false);
        }
        let flags = if notify {
            UpdateFlags::DEFAULT
        } else {
            UpdateFlags::RENDER_UPDATE
        };
        self.apply_block_state(snapshot.pos, snapshot.state, flags)?;
        self.track_snapshot(snapshot);
        Ok(true)
    }
}

/// Split transactions into maximal runs of the same capture type,
/// preserving order.
fn split_runs(transactions: Vec<BlockTransaction>) -> Vec<(CaptureType, Vec<BlockTransaction>)> {
    let mut runs: Vec<(CaptureType, Vec<BlockTransaction>)> = Vec::new();
    for transaction in transactions {
        let kind = transaction.capture_type();
        match runs.last_mut() {
            Some((last, run)) if *last == kind => run.push(transaction),
            _ => runs.push((kind, vec![transaction])),
        }
    }
    runs
}
