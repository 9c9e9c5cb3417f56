use phasetrack_common::{BlockPos, BlockSnapshot, UpdateFlags};

use crate::capture::CaptureType;

/// A proposed change of one block: what was there, what will be there, and
/// an optional listener-supplied replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTransaction {
    original: BlockSnapshot,
    default_replacement: BlockSnapshot,
    custom: Option<BlockSnapshot>,
    capture_type: CaptureType,
    valid: bool,
}

impl BlockTransaction {
    pub fn new(original: BlockSnapshot, replacement: BlockSnapshot, capture_type: CaptureType) -> Self {
        Self {
            original,
            default_replacement: replacement,
            custom: None,
            capture_type,
            valid: true,
        }
    }

    pub fn original(&self) -> &BlockSnapshot {
        &self.original
    }

    pub fn default_replacement(&self) -> &BlockSnapshot {
        &self.default_replacement
    }

    pub fn custom(&self) -> Option<&BlockSnapshot> {
        self.custom.as_ref()
    }

    /// The snapshot that will be committed.
    pub fn final_snapshot(&self) -> &BlockSnapshot {
        self.custom.as_ref().unwrap_or(&self.default_replacement)
    }

    /// Replace the committed result. The position always stays the original's.
    pub fn set_custom(&mut self, mut custom: BlockSnapshot) {
        custom.pos = self.original.pos;
        self.custom = Some(custom);
    }

    pub fn clear_custom(&mut self) {
        self.custom = None;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn capture_type(&self) -> CaptureType {
        self.capture_type
    }

    pub fn pos(&self) -> BlockPos {
        self.original.pos
    }

    /// Flags requested by the mutation that produced this transaction.
    pub fn update_flags(&self) -> UpdateFlags {
        self.original.update_flags
    }
}
