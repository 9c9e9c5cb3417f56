use phasetrack_common::{BlockState, BlockType};

/// Accumulates side effects produced while a phase is active, in
/// submission order, until the phase unwinds.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSupplier<T> {
    captured: Vec<T>,
}

impl<T> Default for CaptureSupplier<T> {
    fn default() -> Self {
        Self {
            captured: Vec::new(),
        }
    }
}

impl<T> CaptureSupplier<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, value: T) {
        self.captured.push(value);
    }

    /// Take everything captured so far, leaving the supplier empty.
    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.captured)
    }

    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }

    pub fn len(&self) -> usize {
        self.captured.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.captured.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.captured.iter_mut()
    }
}

/// How a captured block change is reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureType {
    Break,
    Place,
    Modify,
    Decay,
}

impl CaptureType {
    pub fn classify(original: BlockState, replacement: BlockState, decaying: bool) -> Self {
        if decaying {
            return Self::Decay;
        }
        match (original.block == BlockType::AIR, replacement.block == BlockType::AIR) {
            (false, true) => Self::Break,
            (true, false) => Self::Place,
            _ => Self::Modify,
        }
    }
}

impl std::fmt::Display for CaptureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Break => "break",
            Self::Place => "place",
            Self::Modify => "modify",
            Self::Decay => "decay",
        };
        f.write_str(name)
    }
}
