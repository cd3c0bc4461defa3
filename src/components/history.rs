use std::collections::VecDeque;

use crate::canvas::PixelBuffer;

/// Default number of undo snapshots retained.
pub const MAX_UNDO: usize = 10;

// ============================================================================
// HISTORY MANAGER - bounded full-buffer snapshot stacks
// ============================================================================

/// Undo/redo history of whole-buffer snapshots.
///
/// Both stacks keep the most recent snapshot at the back. The undo stack is
/// capped at `max_history_size`; pushing past the cap evicts from the front.
/// The redo stack only ever holds snapshots popped off the undo side, and is
/// dropped whenever a new line of history begins (`save_state`).
#[derive(Clone, Debug)]
pub struct HistoryManager {
    undo_stack: VecDeque<PixelBuffer>,
    redo_stack: VecDeque<PixelBuffer>,
    max_history_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(MAX_UNDO)
    }
}

impl HistoryManager {
    /// A capacity of 0 is treated as 1.
    pub fn new(max_history_size: usize) -> Self {
        let max_history_size = max_history_size.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(max_history_size + 1),
            redo_stack: VecDeque::new(),
            max_history_size,
        }
    }

    /// Rebuild a history from stored snapshots (oldest first). Anything past
    /// the capacity is evicted oldest-first.
    pub fn from_parts(
        max_history_size: usize,
        undo: Vec<PixelBuffer>,
        redo: Vec<PixelBuffer>,
    ) -> Self {
        let mut history = Self::new(max_history_size);
        history.undo_stack.extend(undo);
        history.redo_stack.extend(redo);
        history.prune();
        history
    }

    /// Begin a new line of history: drop redo, then snapshot `current`.
    pub fn save_state(&mut self, current: &PixelBuffer) {
        self.redo_stack.clear();
        self.undo_stack.push_back(current.clone());
        self.prune();
    }

    /// Swap `current` with the most recent undo snapshot. Returns `false`
    /// (and leaves everything untouched) when there is nothing to undo.
    pub fn undo(&mut self, current: &mut PixelBuffer) -> bool {
        let Some(snapshot) = self.undo_stack.pop_back() else {
            return false;
        };
        let replaced = std::mem::replace(current, snapshot);
        self.redo_stack.push_back(replaced);
        true
    }

    /// Mirror of `undo`.
    pub fn redo(&mut self, current: &mut PixelBuffer) -> bool {
        let Some(snapshot) = self.redo_stack.pop_back() else {
            return false;
        };
        let replaced = std::mem::replace(current, snapshot);
        self.undo_stack.push_back(replaced);
        self.prune();
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn capacity(&self) -> usize {
        self.max_history_size
    }

    /// Snapshots on the undo side, oldest first.
    pub fn undo_snapshots(&self) -> impl Iterator<Item = &PixelBuffer> {
        self.undo_stack.iter()
    }

    /// Snapshots on the redo side, oldest first.
    pub fn redo_snapshots(&self) -> impl Iterator<Item = &PixelBuffer> {
        self.redo_stack.iter()
    }

    /// Total bytes held by both stacks.
    pub fn memory_usage(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(PixelBuffer::memory_size)
            .sum()
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            self.undo_stack.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
