use std::collections::VecDeque;

/// Snapshot-based undo/redo: every recorded entry is a full copy of the
/// state.
#[derive(Debug, Clone)]
pub struct History<T> {
    past: Vec<T>,
    future: VecDeque<T>,
}

impl<T: Clone> History<T> {
    pub fn new() -> Self {
        Self {
            past: Vec::new(),
            future: VecDeque::new(),
        }
    }

    /// Copies `state` onto the undo stack and drops any redo entries.
    pub fn take_snapshot(&mut self, state: &T) {
        self.record(state.clone());
    }

    /// Same as [`History::take_snapshot`] for a state the caller no longer
    /// needs.
    pub fn record(&mut self, state: T) {
        self.past.push(state);
        self.future.clear();
    }

    /// Restores the most recent snapshot into `current`. Returns false when
    /// there is nothing to undo.
    pub fn undo(&mut self, current: &mut T) -> bool {
        let Some(previous) = self.past.pop() else {
            return false;
        };
        let now = std::mem::replace(current, previous);
        self.future.push_front(now);
        true
    }

    /// Re-applies the first undone state. Returns false when there is nothing
    /// to redo.
    pub fn redo(&mut self, current: &mut T) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let now = std::mem::replace(current, next);
        self.past.push(now);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}
